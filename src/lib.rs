//! streambridge: streaming protocol bridge for chat frontends.
//!
//! Translates two kinds of upstream streams into frontend wire protocols:
//!
//! - raw chat-completion chunks into AG-UI events
//!   ([`translate::translate_completion`]),
//! - agent execution events into AI SDK UI message stream frames
//!   ([`translate::translate_agent_run`]) or AG-UI events
//!   ([`translate::translate_agent_ag_ui`]).
//!
//! The `server` feature mounts the translators on axum routes that stream
//! Server-Sent Events; the `cli` feature adds the `streambridge` binary.
//!
//! ```no_run
//! use futures::StreamExt;
//! use streambridge::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(source: std::sync::Arc<dyn CompletionSource>) {
//! let request = CompletionRequest::new(vec![ModelMessage::user("Hello!")]);
//! let invocation = async move { source.stream_chunks(&request).await };
//! let translator = CompletionTranslator::new("thread-1", "run-1");
//! let mut events = translate_completion(translator, invocation, CancellationToken::new());
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod prelude;
pub mod protocol;
pub mod provider;
pub mod tools;
pub mod translate;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;
