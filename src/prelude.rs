//! Convenience re-exports for common use.

pub use crate::agent::{AgentRunner, ToolLoopAgent};
pub use crate::config::BridgeConfig;
pub use crate::error::{BridgeError, Result};
pub use crate::protocol::{AgUiEvent, RunAgentInput, UiStreamFrame};
pub use crate::provider::{CompletionRequest, CompletionSource, ToolDefinition};
pub use crate::tools::{AgentTool, Tool, ToolArguments, ToolParameters, ToolRegistry};
pub use crate::translate::{
    translate_agent_ag_ui, translate_agent_run, translate_completion, AgentAgUiTranslator,
    AgentNodeTranslator, CompletionTranslator,
};
pub use crate::types::{
    AgentEvent, CompletionChunk, ContentPart, ModelMessage, Role, ToolCallDelta, ToolOutput,
};
