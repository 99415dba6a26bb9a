//! Internal conversation representation consumed by completion sources and agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ModelMessage {
    fn with_parts(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system prompt message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create a user prompt message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create an assistant message holding only text.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_parts(Role::Assistant, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create an assistant message from arbitrary parts (text and tool calls).
    pub fn assistant_parts(parts: Vec<ContentPart>) -> Self {
        Self::with_parts(Role::Assistant, parts)
    }

    /// Create a tool return message answering `tool_call_id`.
    pub fn tool_return(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self::with_parts(
            Role::Tool,
            vec![ContentPart::ToolReturn(ToolReturnPart {
                tool_call_id: tool_call_id.into(),
                tool_name: tool_name.into(),
                content,
            })],
        )
    }

    /// Extract the text content, concatenating all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract tool calls from this message.
    pub fn tool_calls(&self) -> Vec<&ToolCallPart> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }

    /// First tool return carried by this message, if any.
    pub fn tool_return_part(&self) -> Option<&ToolReturnPart> {
        self.content.iter().find_map(|part| match part {
            ContentPart::ToolReturn(tr) => Some(tr),
            _ => None,
        })
    }
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ToolCall(ToolCallPart),
    ToolReturn(ToolReturnPart),
}

/// A tool call requested by the model, fully materialised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: serde_json::Value,
}

/// The answer to a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolReturnPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: serde_json::Value,
}
