//! Agent events to AG-UI events, for AG-UI clients driving the agent.

use std::future::Future;

use futures::stream::BoxStream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{open, pull, Pulled};
use crate::context::RunContext;
use crate::error::{BridgeError, Result};
use crate::protocol::AgUiEvent;
use crate::types::{AgentEvent, AgentEventStream, Part, PartDelta, ToolCallPart, ToolReturn};

#[derive(Debug)]
pub struct AgentAgUiTranslator {
    thread_id: String,
    run_id: String,
    started: bool,
    ctx: RunContext,
    last_message_id: Option<String>,
}

impl AgentAgUiTranslator {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            started: false,
            ctx: RunContext::new(),
            last_message_id: None,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn start(&mut self) -> Option<AgUiEvent> {
        if self.started || self.ctx.is_terminated() {
            return None;
        }
        self.started = true;
        info!(thread_id = %self.thread_id, run_id = %self.run_id, "agent run started");
        Some(AgUiEvent::run_started(&self.thread_id, &self.run_id))
    }

    pub fn on_event(&mut self, event: &AgentEvent) -> Result<Vec<AgUiEvent>> {
        if self.ctx.is_terminated() {
            return Ok(Vec::new());
        }

        let mut frames = Vec::new();
        match event {
            AgentEvent::UserPrompt { .. } => {}
            AgentEvent::PartStart { part, .. } => match part {
                Part::Text { content } => self.push_text(content, &mut frames),
                Part::ToolCall {
                    tool_call_id,
                    tool_name,
                    args,
                } => {
                    self.ctx.record_tool_call(tool_call_id, Some(tool_name));
                    if !args.is_empty() {
                        self.ctx.push_tool_arguments(tool_call_id, args);
                    }
                }
            },
            AgentEvent::PartDelta { delta, .. } => match delta {
                PartDelta::Text { content_delta } => self.push_text(content_delta, &mut frames),
                PartDelta::ToolCall {
                    tool_call_id,
                    args_delta,
                } => {
                    if !self.ctx.push_tool_arguments(tool_call_id, args_delta) {
                        return Err(BridgeError::MalformedEvent(format!(
                            "argument delta for unknown tool call {tool_call_id}"
                        )));
                    }
                }
            },
            AgentEvent::FunctionToolCall { part } => self.announce(part, &mut frames)?,
            AgentEvent::FunctionToolResult { result } => self.on_tool_result(result, &mut frames)?,
            AgentEvent::End { .. } => frames.extend(self.finish()),
        }
        Ok(frames)
    }

    fn push_text(&mut self, text: &str, frames: &mut Vec<AgUiEvent>) {
        if text.is_empty() {
            return;
        }
        let message_id = match self.ctx.open_text_id() {
            Some(id) => id.to_string(),
            None => {
                let id = self.ctx.open_text_span();
                frames.push(AgUiEvent::TextMessageStart {
                    message_id: id.clone(),
                    role: "assistant".into(),
                });
                self.last_message_id = Some(id.clone());
                id
            }
        };
        frames.push(AgUiEvent::TextMessageContent {
            message_id,
            delta: text.to_string(),
        });
    }

    fn close_text(&mut self, frames: &mut Vec<AgUiEvent>) {
        if let Some(message_id) = self.ctx.close_text_span() {
            frames.push(AgUiEvent::TextMessageEnd { message_id });
        }
    }

    fn announce(&mut self, part: &ToolCallPart, frames: &mut Vec<AgUiEvent>) -> Result<()> {
        self.close_text(frames);
        self.ctx
            .record_tool_call(&part.tool_call_id, Some(&part.tool_name));
        let args = serde_json::to_string(&part.args)?;
        self.emit_call(&part.tool_call_id, &part.tool_name, args, frames);
        Ok(())
    }

    fn emit_call(&mut self, call_id: &str, name: &str, args: String, frames: &mut Vec<AgUiEvent>) {
        debug!(tool_call_id = %call_id, tool_name = %name, "tool call announced");
        frames.push(AgUiEvent::ToolCallStart {
            tool_call_id: call_id.to_string(),
            tool_call_name: name.to_string(),
            parent_message_id: self.last_message_id.clone(),
        });
        frames.push(AgUiEvent::ToolCallArgs {
            tool_call_id: call_id.to_string(),
            delta: args,
        });
        frames.push(AgUiEvent::ToolCallEnd {
            tool_call_id: call_id.to_string(),
        });
        self.ctx.announce_tool_call(call_id);
    }

    fn on_tool_result(&mut self, result: &ToolReturn, frames: &mut Vec<AgUiEvent>) -> Result<()> {
        let span = self.ctx.tool_call(&result.tool_call_id).cloned().ok_or_else(|| {
            BridgeError::MalformedEvent(format!(
                "result for unknown tool call {}",
                result.tool_call_id
            ))
        })?;
        if !span.announced {
            self.close_text(frames);
            let name = if span.tool_name.is_empty() {
                result.tool_name.clone()
            } else {
                span.tool_name.clone()
            };
            self.emit_call(&span.call_id, &name, span.arguments(), frames);
        }

        let content = match result.content.normalize()? {
            Value::String(s) => s,
            other => other.to_string(),
        };
        self.ctx.resolve_tool_call(&result.tool_call_id);
        frames.push(AgUiEvent::ToolCallResult {
            message_id: Uuid::new_v4().to_string(),
            tool_call_id: result.tool_call_id.clone(),
            content,
            role: "tool".into(),
        });
        Ok(())
    }

    /// Close any open text message, then `RUN_FINISHED`.
    pub fn finish(&mut self) -> Vec<AgUiEvent> {
        if self.ctx.is_terminated() {
            return Vec::new();
        }
        let mut frames = Vec::new();
        self.close_text(&mut frames);
        self.ctx.terminate();
        info!(thread_id = %self.thread_id, run_id = %self.run_id, "agent run finished");
        frames.push(AgUiEvent::run_finished(&self.thread_id, &self.run_id));
        frames
    }

    pub fn fail(&mut self, error: &BridgeError) -> Option<AgUiEvent> {
        if self.ctx.is_terminated() {
            return None;
        }
        self.ctx.terminate();
        warn!(
            run_id = %self.run_id,
            error = %error,
            category = error.category().code(),
            retryable = error.is_retryable(),
            "agent run failed",
        );
        Some(AgUiEvent::run_error(error.to_string()))
    }
}

/// Drive an agent run for AG-UI clients. A failure yields `RUN_ERROR` and
/// ends the stream.
pub fn translate_agent_ag_ui<F>(
    translator: AgentAgUiTranslator,
    invocation: F,
    cancel: CancellationToken,
) -> BoxStream<'static, AgUiEvent>
where
    F: Future<Output = Result<AgentEventStream>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut translator = translator;
        if let Some(frame) = translator.start() {
            yield frame;
        }

        let mut upstream = match open(invocation, &cancel).await {
            None => return,
            Some(Ok(upstream)) => upstream,
            Some(Err(e)) => {
                if let Some(frame) = translator.fail(&e) {
                    yield frame;
                }
                return;
            }
        };

        loop {
            let event = match pull(&mut upstream, &cancel).await {
                Pulled::Item(Ok(event)) => event,
                Pulled::Item(Err(e)) => {
                    if let Some(frame) = translator.fail(&e) {
                        yield frame;
                    }
                    return;
                }
                Pulled::Exhausted => break,
                Pulled::Cancelled => {
                    info!(run_id = %translator.run_id, "client disconnected, releasing agent run");
                    return;
                }
            };

            match translator.on_event(&event) {
                Ok(frames) => {
                    for frame in frames {
                        yield frame;
                    }
                }
                Err(e) => {
                    if let Some(frame) = translator.fail(&e) {
                        yield frame;
                    }
                    return;
                }
            }
        }

        for frame in translator.finish() {
            yield frame;
        }
    };

    Box::pin(stream)
}
