//! Upstream event model: what models and agents hand to the translators.

use std::fmt;
use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::message::ToolCallPart;
use crate::error::{BridgeError, Result};

/// Stream of completion chunks produced by a [`CompletionSource`](crate::provider::CompletionSource).
pub type ChunkStream = BoxStream<'static, Result<CompletionChunk>>;

/// Stream of agent events produced by an [`AgentRunner`](crate::agent::AgentRunner).
pub type AgentEventStream = BoxStream<'static, Result<AgentEvent>>;

/// One raw chunk of a streaming chat completion.
///
/// A chunk may carry a text fragment, tool-call fragments, both, or neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
}

impl CompletionChunk {
    /// A chunk carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A chunk carrying a single tool-call fragment.
    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            content: None,
            tool_calls: vec![delta],
        }
    }

    /// Text fragment, if non-empty.
    pub fn text_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// True when the chunk carries nothing worth forwarding.
    pub fn is_empty(&self) -> bool {
        self.text_content().is_none() && self.tool_calls.iter().all(ToolCallDelta::is_empty)
    }
}

/// A fragment of a tool call inside a completion chunk.
///
/// Providers send the call id and function name on the first fragment of a
/// call and only the `index` afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    /// First fragment of a call: id, name and an optional argument fragment.
    pub fn start(
        index: u32,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: Some(arguments.into()),
        }
    }

    /// Continuation fragment carrying only more arguments.
    pub fn args(index: u32, arguments: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            name: None,
            arguments: Some(arguments.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.arguments.as_deref().map_or(true, str::is_empty)
    }
}

/// A part as first seen inside a model request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum Part {
    Text {
        #[serde(default)]
        content: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: String,
    },
}

/// An increment to a part already started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_delta_kind", rename_all = "kebab-case")]
pub enum PartDelta {
    Text {
        content_delta: String,
    },
    ToolCall {
        tool_call_id: String,
        args_delta: String,
    },
}

/// Result of a tool execution as reported by the agent.
#[derive(Debug, Clone)]
pub struct ToolReturn {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: ToolOutput,
}

/// One event of an agent run, in execution-graph order.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Echo of the user prompt. The client already has it.
    UserPrompt { content: String },
    /// A part began inside a model-request node.
    PartStart { index: usize, part: Part },
    /// A started part received more content.
    PartDelta { index: usize, delta: PartDelta },
    /// A tool-invocation node is about to call a tool.
    FunctionToolCall { part: ToolCallPart },
    /// A tool-invocation node received a tool's result.
    FunctionToolResult { result: ToolReturn },
    /// The run finished.
    End { output: String },
}

/// Capability of a value to convert itself into structured JSON.
pub trait StructuredOutput: Send + Sync + fmt::Debug {
    fn to_structured(&self) -> Result<serde_json::Value>;
}

impl<T> StructuredOutput for T
where
    T: Serialize + Send + Sync + fmt::Debug,
{
    fn to_structured(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(BridgeError::from)
    }
}

/// A tool result payload: either a plain JSON value or a value that knows
/// how to turn itself into one.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Plain(serde_json::Value),
    Structured(Arc<dyn StructuredOutput>),
}

impl ToolOutput {
    pub fn plain(value: impl Into<serde_json::Value>) -> Self {
        Self::Plain(value.into())
    }

    pub fn structured<T: StructuredOutput + 'static>(value: T) -> Self {
        Self::Structured(Arc::new(value))
    }

    /// Normalize to the JSON value written to the wire.
    pub fn normalize(&self) -> Result<serde_json::Value> {
        match self {
            Self::Plain(value) => Ok(value.clone()),
            Self::Structured(value) => value.to_structured(),
        }
    }
}

impl From<serde_json::Value> for ToolOutput {
    fn from(value: serde_json::Value) -> Self {
        Self::Plain(value)
    }
}
