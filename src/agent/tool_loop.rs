//! Streaming tool loop: model request, tool calls, tool results, repeat.

use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use futures::StreamExt;
use indexmap::IndexMap;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AgentRunner;
use crate::config::DEFAULT_MAX_STEPS;
use crate::error::{BridgeError, Result};
use crate::protocol::ag_ui::parse_arguments;
use crate::provider::{CompletionRequest, CompletionSource};
use crate::tools::{ToolArguments, ToolRegistry};
use crate::types::{
    AgentEvent, AgentEventStream, CompletionChunk, ContentPart, ModelMessage, Part, PartDelta,
    Role, ToolCallPart, ToolOutput, ToolReturn,
};

/// Agent that streams model requests and executes the tools the model asks
/// for until the model answers without calling any.
#[derive(Clone, Builder)]
pub struct ToolLoopAgent {
    source: Arc<dyn CompletionSource>,
    #[builder(default)]
    tools: ToolRegistry,
    #[builder(into)]
    system_prompt: Option<String>,
    #[builder(default = DEFAULT_MAX_STEPS)]
    max_steps: usize,
}

impl std::fmt::Debug for ToolLoopAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolLoopAgent")
            .field("model", &self.source.model_id())
            .field("tools", &self.tools)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl ToolLoopAgent {
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn initial_messages(&self, prompt: &str, history: Vec<ModelMessage>) -> Vec<ModelMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        let has_system = history.iter().any(|m| m.role == Role::System);
        if let Some(system) = self.system_prompt.as_deref().filter(|_| !has_system) {
            messages.push(ModelMessage::system(system));
        }
        messages.extend(history);
        messages.push(ModelMessage::user(prompt));
        messages
    }

    /// Execute one tool call. Failures become an `{"error": ...}` output so
    /// the model can see what went wrong and recover.
    async fn call_tool(&self, call: &ToolCallPart) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.tool_name) else {
            warn!(tool = %call.tool_name, "model called unknown tool");
            return ToolOutput::plain(json!({ "error": format!("Unknown tool: {}", call.tool_name) }));
        };
        match tool.execute(&ToolArguments::new(call.args.clone())).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.tool_name, error = %e, "tool execution failed");
                ToolOutput::plain(json!({ "error": e.to_string() }))
            }
        }
    }
}

#[async_trait]
impl AgentRunner for ToolLoopAgent {
    async fn run(&self, prompt: String, history: Vec<ModelMessage>) -> Result<AgentEventStream> {
        let agent = self.clone();
        let mut messages = agent.initial_messages(&prompt, history);
        let definitions = agent.tools.definitions();

        info!(model = %agent.source.model_id(), history = messages.len() - 1, "agent run starting");

        let stream = async_stream::stream! {
            yield Ok(AgentEvent::UserPrompt { content: prompt });

            let mut step = 0usize;
            loop {
                step += 1;
                if step > agent.max_steps {
                    yield Err(BridgeError::InvalidState(format!(
                        "agent exceeded {} model requests",
                        agent.max_steps
                    )));
                    return;
                }

                let request = CompletionRequest::new(messages.clone()).with_tools(definitions.clone());
                let mut chunks = match agent.source.stream_chunks(&request).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut state = StepState::default();
                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(chunk) => {
                            for event in state.on_chunk(&chunk) {
                                yield Ok(event);
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                drop(chunks);

                let (text, calls) = state.into_parts();
                debug!(step, tool_calls = calls.len(), text_len = text.len(), "model request complete");

                if calls.is_empty() {
                    info!(step, "agent run complete");
                    yield Ok(AgentEvent::End { output: text });
                    return;
                }

                let mut assistant = Vec::with_capacity(calls.len() + 1);
                if !text.is_empty() {
                    assistant.push(ContentPart::Text { text });
                }
                assistant.extend(calls.iter().cloned().map(ContentPart::ToolCall));
                messages.push(ModelMessage::assistant_parts(assistant));

                for call in calls {
                    yield Ok(AgentEvent::FunctionToolCall { part: call.clone() });
                    let output = agent.call_tool(&call).await;
                    let content = output
                        .normalize()
                        .unwrap_or_else(|e| json!({ "error": e.to_string() }));
                    messages.push(ModelMessage::tool_return(&call.tool_call_id, &call.tool_name, content));
                    yield Ok(AgentEvent::FunctionToolResult {
                        result: ToolReturn {
                            tool_call_id: call.tool_call_id,
                            tool_name: call.tool_name,
                            content: output,
                        },
                    });
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Default)]
struct PendingCall {
    stream_index: u32,
    part_index: usize,
    call_id: String,
    tool_name: String,
    arguments: String,
}

/// Part bookkeeping for a single model request.
///
/// Calls are kept in arrival order. `current` maps a stream index to the
/// call it currently continues; a fragment with a new id at a used index
/// starts another call (providers that omit `index` send every call at 0).
#[derive(Debug, Default)]
struct StepState {
    next_part: usize,
    text_part: Option<usize>,
    text: String,
    calls: Vec<PendingCall>,
    current: IndexMap<u32, usize>,
}

impl StepState {
    fn on_chunk(&mut self, chunk: &CompletionChunk) -> Vec<AgentEvent> {
        let mut events = Vec::new();

        if let Some(text) = chunk.text_content() {
            self.text.push_str(text);
            match self.text_part {
                Some(index) => events.push(AgentEvent::PartDelta {
                    index,
                    delta: PartDelta::Text {
                        content_delta: text.to_string(),
                    },
                }),
                None => {
                    let index = self.allocate();
                    self.text_part = Some(index);
                    events.push(AgentEvent::PartStart {
                        index,
                        part: Part::Text {
                            content: text.to_string(),
                        },
                    });
                }
            }
        }

        for delta in chunk.tool_calls.iter().filter(|d| !d.is_empty()) {
            let args = delta.arguments.clone().unwrap_or_default();
            let new_id = delta.id.as_deref().filter(|id| !id.is_empty());

            if let Some(call) = self.continued_call(delta.index, new_id) {
                if call.tool_name.is_empty() {
                    if let Some(name) = &delta.name {
                        call.tool_name = name.clone();
                    }
                }
                call.arguments.push_str(&args);
                if !args.is_empty() {
                    events.push(AgentEvent::PartDelta {
                        index: call.part_index,
                        delta: PartDelta::ToolCall {
                            tool_call_id: call.call_id.clone(),
                            args_delta: args,
                        },
                    });
                }
                continue;
            }

            let call_id = new_id.map(str::to_string).unwrap_or_else(|| {
                debug!(index = delta.index, "tool call without id, assigning one");
                format!("call_{}", Uuid::new_v4().simple())
            });
            let part_index = self.allocate();
            let call = PendingCall {
                stream_index: delta.index,
                part_index,
                call_id: call_id.clone(),
                tool_name: delta.name.clone().unwrap_or_default(),
                arguments: args.clone(),
            };
            events.push(AgentEvent::PartStart {
                index: part_index,
                part: Part::ToolCall {
                    tool_call_id: call_id,
                    tool_name: call.tool_name.clone(),
                    args,
                },
            });
            self.current.insert(delta.index, self.calls.len());
            self.calls.push(call);
        }

        events
    }

    /// The call a fragment at `index` continues, unless it names another id.
    fn continued_call(&mut self, index: u32, new_id: Option<&str>) -> Option<&mut PendingCall> {
        let position = *self.current.get(&index)?;
        let call = &mut self.calls[position];
        match new_id {
            Some(id) if id != call.call_id => None,
            _ => Some(call),
        }
    }

    fn allocate(&mut self) -> usize {
        let index = self.next_part;
        self.next_part += 1;
        index
    }

    /// Full text and materialised tool calls, ordered by stream index and
    /// then by arrival.
    fn into_parts(self) -> (String, Vec<ToolCallPart>) {
        let mut calls = self.calls;
        calls.sort_by_key(|call| call.stream_index);
        let calls = calls
            .into_iter()
            .map(|call| ToolCallPart {
                tool_call_id: call.call_id,
                tool_name: call.tool_name,
                args: parse_arguments(&call.arguments),
            })
            .collect();
        (self.text, calls)
    }
}
