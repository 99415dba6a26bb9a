//! AG-UI protocol types: run input and the events streamed back.
//!
//! Field names follow the AG-UI wire format (camelCase, `SCREAMING_SNAKE`
//! event types). Inbound fields also accept their snake_case spelling.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::provider::ToolDefinition;
use crate::types::{ContentPart, ModelMessage, ToolCallPart};

/// Events emitted to AG-UI clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgUiEvent {
    RunStarted {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "runId")]
        run_id: String,
    },
    RunFinished {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "runId")]
        run_id: String,
    },
    RunError {
        message: String,
    },
    TextMessageStart {
        #[serde(rename = "messageId")]
        message_id: String,
        role: String,
    },
    TextMessageContent {
        #[serde(rename = "messageId")]
        message_id: String,
        delta: String,
    },
    TextMessageEnd {
        #[serde(rename = "messageId")]
        message_id: String,
    },
    /// Self-contained text fragment; clients assemble start/content/end.
    TextMessageChunk {
        #[serde(rename = "messageId")]
        message_id: String,
        delta: String,
    },
    ToolCallStart {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolCallName")]
        tool_call_name: String,
        #[serde(rename = "parentMessageId", skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },
    ToolCallArgs {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        delta: String,
    },
    ToolCallEnd {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
    },
    /// Self-contained tool-call fragment. The name is only present on the
    /// fragment where the model supplied it.
    ToolCallChunk {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolCallName", skip_serializing_if = "Option::is_none")]
        tool_call_name: Option<String>,
        #[serde(rename = "parentMessageId", skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        delta: Option<String>,
    },
    ToolCallResult {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        content: String,
        role: String,
    },
}

impl AgUiEvent {
    pub fn run_started(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::RunStarted {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        }
    }

    pub fn run_finished(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::RunFinished {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
        }
    }

    pub fn run_error(message: impl Into<String>) -> Self {
        Self::RunError {
            message: message.into(),
        }
    }

    pub fn text_chunk(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextMessageChunk {
            message_id: message_id.into(),
            delta: delta.into(),
        }
    }

    /// Wire name of the event type, e.g. `RUN_STARTED`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "RUN_STARTED",
            Self::RunFinished { .. } => "RUN_FINISHED",
            Self::RunError { .. } => "RUN_ERROR",
            Self::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            Self::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            Self::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            Self::TextMessageChunk { .. } => "TEXT_MESSAGE_CHUNK",
            Self::ToolCallStart { .. } => "TOOL_CALL_START",
            Self::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            Self::ToolCallEnd { .. } => "TOOL_CALL_END",
            Self::ToolCallChunk { .. } => "TOOL_CALL_CHUNK",
            Self::ToolCallResult { .. } => "TOOL_CALL_RESULT",
        }
    }
}

/// Body of an AG-UI `POST /` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAgentInput {
    #[serde(rename = "threadId", alias = "thread_id")]
    pub thread_id: String,
    #[serde(rename = "runId", alias = "run_id")]
    pub run_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default)]
    pub context: Vec<Value>,
    #[serde(
        rename = "forwardedProps",
        alias = "forwarded_props",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub forwarded_props: Option<Value>,
}

/// A conversation message as sent by AG-UI clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: AgUiRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        rename = "toolCalls",
        alias = "tool_calls",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_calls: Option<Vec<AgUiToolCall>>,
    #[serde(
        rename = "toolCallId",
        alias = "tool_call_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_call_id: Option<String>,
}

/// Message roles accepted from AG-UI clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgUiRole {
    Developer,
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call recorded on an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgUiToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function name and JSON-encoded arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A frontend-declared tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

impl Message {
    /// Convert to the internal representation.
    pub fn to_model_message(&self) -> ModelMessage {
        let content = self.content.clone().unwrap_or_default();
        match self.role {
            AgUiRole::Developer | AgUiRole::System => ModelMessage::system(content),
            AgUiRole::User => ModelMessage::user(content),
            AgUiRole::Assistant => {
                let mut parts = Vec::new();
                if !content.is_empty() {
                    parts.push(ContentPart::Text { text: content });
                }
                for call in self.tool_calls.iter().flatten() {
                    parts.push(ContentPart::ToolCall(ToolCallPart {
                        tool_call_id: call.id.clone(),
                        tool_name: call.function.name.clone(),
                        args: parse_arguments(&call.function.arguments),
                    }));
                }
                if parts.is_empty() {
                    parts.push(ContentPart::Text { text: String::new() });
                }
                ModelMessage::assistant_parts(parts)
            }
            AgUiRole::Tool => ModelMessage::tool_return(
                self.tool_call_id.clone().unwrap_or_default(),
                "",
                Value::String(content),
            ),
        }
    }
}

impl RunAgentInput {
    /// Every message, converted to the internal representation.
    pub fn to_model_messages(&self) -> Vec<ModelMessage> {
        self.messages.iter().map(Message::to_model_message).collect()
    }

    /// Split off the most recent user message as the prompt; everything
    /// before it is history.
    pub fn split_prompt(&self) -> (String, Vec<ModelMessage>) {
        let Some(last_user) = self
            .messages
            .iter()
            .rposition(|m| m.role == AgUiRole::User)
        else {
            debug!(thread_id = %self.thread_id, "run input has no user message");
            return (String::new(), self.to_model_messages());
        };

        let prompt = self.messages[last_user].content.clone().unwrap_or_default();
        let history = self.messages[..last_user]
            .iter()
            .map(Message::to_model_message)
            .collect();
        (prompt, history)
    }

    /// Frontend tools as provider tool definitions.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            })
            .collect()
    }
}

/// Parse JSON-encoded arguments, keeping the raw string when it is not JSON.
pub(crate) fn parse_arguments(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(raw.to_string()))
}
