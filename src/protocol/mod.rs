//! Wire protocols spoken to frontends.

pub mod ag_ui;
pub mod sse;
pub mod ui_stream;

pub use ag_ui::{AgUiEvent, RunAgentInput};
pub use sse::{encode_frame, negotiate_content_type, SSE_CONTENT_TYPE};
pub use ui_stream::UiStreamFrame;
