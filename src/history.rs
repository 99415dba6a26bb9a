//! Maps `useChat` conversation history onto the internal message model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{ContentPart, ModelMessage, ToolCallPart};

/// Body of a `POST /chat` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatMessageRequest {
    /// Decode a request body. Anything that is not a valid request becomes an
    /// empty conversation.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|e| {
            warn!(error = %e, "malformed chat request, treating as empty conversation");
            Self::default()
        })
    }
}

/// One client message. `parts` is preferred over `content` when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<UiMessagePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UiMessagePart {
    #[serde(rename = "type", default)]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "toolCallId", default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(rename = "toolName", default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl ChatMessage {
    fn text_parts(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|p| p.part_type == "text")
            .map(|p| p.text.as_deref().unwrap_or_default())
            .collect()
    }

    /// Text of the message: text parts joined by a space, else `content`.
    fn joined_text(&self) -> String {
        if self.parts.is_empty() {
            self.content.clone().unwrap_or_default()
        } else {
            self.text_parts().join(" ")
        }
    }

    fn tool_result(&self, call_id: &str) -> Option<&Value> {
        self.parts
            .iter()
            .find(|p| p.part_type == "tool-result" && p.tool_call_id.as_deref() == Some(call_id))
            .and_then(|p| p.output.as_ref())
    }
}

/// Convert client messages into `(prompt, history)`.
///
/// The most recent user message is the prompt. History is the system prompt
/// (when given) followed by every message except the last one.
pub fn convert_chat_messages(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
) -> (String, Vec<ModelMessage>) {
    debug!(count = messages.len(), "converting chat messages");
    let Some((_, earlier)) = messages.split_last() else {
        return (String::new(), Vec::new());
    };

    let prompt = messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(ChatMessage::joined_text)
        .unwrap_or_default();

    let mut history = Vec::new();
    if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
        history.push(ModelMessage::system(system));
    }

    for message in earlier {
        match message.role.as_str() {
            "user" => history.push(ModelMessage::user(message.joined_text())),
            "assistant" => push_assistant(message, &mut history),
            other => debug!(role = other, "skipping message with unsupported role"),
        }
    }

    (prompt, history)
}

fn push_assistant(message: &ChatMessage, history: &mut Vec<ModelMessage>) {
    let mut parts = Vec::new();
    if message.parts.is_empty() {
        if let Some(content) = &message.content {
            parts.push(ContentPart::Text {
                text: content.clone(),
            });
        }
    } else {
        let texts = message.text_parts();
        if !texts.is_empty() {
            parts.push(ContentPart::Text {
                text: texts.join(" "),
            });
        }
    }

    let calls: Vec<ToolCallPart> = message
        .parts
        .iter()
        .filter(|p| p.part_type == "tool-call")
        .map(|p| ToolCallPart {
            tool_call_id: p.tool_call_id.clone().unwrap_or_default(),
            tool_name: p.tool_name.clone().unwrap_or_default(),
            args: p.input.clone().unwrap_or_else(|| Value::Object(Default::default())),
        })
        .collect();
    parts.extend(calls.iter().cloned().map(ContentPart::ToolCall));

    if parts.is_empty() {
        return;
    }
    history.push(ModelMessage::assistant_parts(parts));

    for call in &calls {
        if let Some(output) = message.tool_result(&call.tool_call_id) {
            history.push(ModelMessage::tool_return(
                &call.tool_call_id,
                &call.tool_name,
                output.clone(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn messages(value: Value) -> Vec<ChatMessage> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_conversation() {
        let (prompt, history) = convert_chat_messages(&[], Some("system"));
        assert_eq!(prompt, "");
        assert!(history.is_empty());
    }

    #[test]
    fn latest_user_message_is_prompt() {
        let msgs = messages(json!([
            {"role": "user", "parts": [{"type": "text", "text": "What is"}, {"type": "text", "text": "red?"}]},
        ]));
        let (prompt, history) = convert_chat_messages(&msgs, None);
        assert_eq!(prompt, "What is red?");
        assert!(history.is_empty());
    }

    #[test]
    fn content_is_fallback_when_parts_absent() {
        let msgs = messages(json!([{"role": "user", "content": "hello"}]));
        let (prompt, _) = convert_chat_messages(&msgs, None);
        assert_eq!(prompt, "hello");
    }

    #[test]
    fn system_prompt_leads_history() {
        let msgs = messages(json!([
            {"role": "user", "content": "first"},
            {"role": "assistant", "content": "answer"},
            {"role": "user", "content": "second"},
        ]));
        let (prompt, history) = convert_chat_messages(&msgs, Some("be brief"));
        assert_eq!(prompt, "second");
        let roles: Vec<_> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(history[0].text(), "be brief");
        assert_eq!(history[2].text(), "answer");
    }

    #[test]
    fn assistant_tool_calls_with_results_become_tool_returns() {
        let msgs = messages(json!([
            {"role": "user", "content": "sum 1 and 2"},
            {"role": "assistant", "parts": [
                {"type": "text", "text": "Adding."},
                {"type": "tool-call", "toolCallId": "c1", "toolName": "sum", "input": {"a": 1, "b": 2}},
                {"type": "tool-call", "toolCallId": "c2", "toolName": "sum", "input": {"a": 0, "b": 0}},
                {"type": "tool-result", "toolCallId": "c1", "output": 3},
            ]},
            {"role": "user", "content": "thanks"},
        ]));
        let (_, history) = convert_chat_messages(&msgs, None);

        assert_eq!(history.len(), 3);
        let assistant = &history[1];
        assert_eq!(assistant.text(), "Adding.");
        assert_eq!(assistant.tool_calls().len(), 2);
        assert_eq!(assistant.tool_calls()[0].args, json!({"a": 1, "b": 2}));

        let ret = history[2].tool_return_part().unwrap();
        assert_eq!(ret.tool_call_id, "c1");
        assert_eq!(ret.tool_name, "sum");
        assert_eq!(ret.content, json!(3));
    }

    #[test]
    fn malformed_body_is_empty_conversation() {
        let request = ChatMessageRequest::from_slice(b"{\"messages\": 42}");
        assert!(request.messages.is_empty());
        let (prompt, history) = convert_chat_messages(&request.messages, Some("sys"));
        assert_eq!(prompt, "");
        assert!(history.is_empty());
    }
}
