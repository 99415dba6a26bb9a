//! OpenAI-compatible Chat Completions source (OpenAI, Gemini's OpenAI endpoint, ...).

use async_trait::async_trait;
use bon::Builder;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::error::{BridgeError, Result};
use crate::types::*;

use super::http::{bearer_headers, drain_lines, parse_sse_data, shared_client, status_to_error};
use super::{CompletionRequest, CompletionSource};
use crate::config::{BridgeConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Debug, Clone, Builder)]
pub struct OpenAiCompatibleSource {
    #[builder(into)]
    api_key: Option<String>,
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    base_url: String,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    model: String,
}

impl OpenAiCompatibleSource {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.api_key.clone(), &config.base_url, &config.model)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let messages = request
            .messages
            .iter()
            .map(message_to_openai)
            .collect::<Vec<_>>();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        if !request.tools.is_empty() {
            let tool_defs: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
        }

        body
    }
}

#[async_trait]
impl CompletionSource for OpenAiCompatibleSource {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_chunks(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            BridgeError::Authentication(
                "no API key configured (set STREAMBRIDGE_API_KEY, GEMINI_API_KEY or OPENAI_API_KEY)"
                    .into(),
            )
        })?;
        let body = self.build_request_body(request);

        debug!(model = %self.model, messages = request.messages.len(), tools = request.tools.len(), "opening completion stream");

        let resp = shared_client()
            .post(self.endpoint())
            .headers(bearer_headers(api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(BridgeError::Network(e));
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                let lines = match drain_lines(&mut buffer) {
                    Ok(lines) => lines,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                for line in lines {
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }
                    if line == "data: [DONE]" || line == "data:[DONE]" {
                        trace!("completion stream done");
                        return;
                    }
                    let Some(data) = parse_sse_data(&line) else {
                        continue;
                    };
                    match parse_stream_chunk(data) {
                        Ok(Some(chunk)) => yield Ok(chunk),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Parse one `data:` payload. `Ok(None)` for chunks without a choice.
fn parse_stream_chunk(data: &str) -> Result<Option<CompletionChunk>> {
    let raw: OpenAiStreamChunk = serde_json::from_str(data)
        .map_err(|e| BridgeError::MalformedEvent(format!("{e}: {data}")))?;

    if let Some(error) = raw.error {
        return Err(BridgeError::Upstream(error.message));
    }

    let Some(choice) = raw.choices.into_iter().next() else {
        return Ok(None);
    };
    let tool_calls = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let function = tc.function.unwrap_or_default();
            ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name: function.name,
                arguments: function.arguments,
            }
        })
        .collect();

    Ok(Some(CompletionChunk {
        content: choice.delta.content,
        tool_calls,
    }))
}

fn message_to_openai(msg: &ModelMessage) -> Value {
    if let Some(ret) = msg.tool_return_part() {
        let content = match &ret.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return json!({
            "role": "tool",
            "tool_call_id": ret.tool_call_id,
            "content": content,
        });
    }

    let role = msg.role.to_string();
    let tool_calls = msg.tool_calls();
    if tool_calls.is_empty() {
        return json!({ "role": role, "content": msg.text() });
    }

    let tc_json: Vec<Value> = tool_calls
        .iter()
        .map(|tc| {
            json!({
                "id": tc.tool_call_id,
                "type": "function",
                "function": {
                    "name": tc.tool_name,
                    "arguments": tc.args.to_string(),
                }
            })
        })
        .collect();
    json!({
        "role": role,
        "content": msg.text(),
        "tool_calls": tc_json,
    })
}

// OpenAI streaming wire types (internal)

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    error: Option<OpenAiStreamError>,
}

#[derive(Deserialize)]
struct OpenAiStreamError {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiStreamDelta,
}

#[derive(Deserialize, Default)]
struct OpenAiStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiStreamToolCall {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Deserialize, Default)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}
