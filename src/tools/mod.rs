//! Tools the agent runtime can execute.

pub mod arguments;
pub mod builtin;
pub mod registry;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use builtin::color_to_hex_tool;
pub use registry::ToolRegistry;
pub use tool::{AgentTool, Tool};
pub use types::ToolParameters;
