//! Completion sources: where raw chat-completion chunks come from.

pub mod http;

#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ChunkStream, ModelMessage};

#[cfg(feature = "openai")]
pub use openai::OpenAiCompatibleSource;

/// A request for one streaming completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ModelMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Tool definition sent to the model API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Anything that can stream completion chunks for a conversation.
///
/// Dropping the returned stream must release the underlying connection.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Identifier of the model behind this source, for logs.
    fn model_id(&self) -> &str;

    async fn stream_chunks(&self, request: &CompletionRequest) -> Result<ChunkStream>;
}
