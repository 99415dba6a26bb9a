//! Agent runtime: turns a prompt and history into a stream of agent events.

pub mod tool_loop;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AgentEventStream, ModelMessage};

pub use tool_loop::ToolLoopAgent;

/// Something that can run an agent and report its progress as events.
///
/// Dropping the returned stream abandons the run.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, prompt: String, history: Vec<ModelMessage>) -> Result<AgentEventStream>;
}
