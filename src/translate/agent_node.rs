//! Agent events to AI SDK UI stream frames.

use std::future::Future;

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{open, pull, Pulled};
use crate::context::RunContext;
use crate::error::{BridgeError, Result};
use crate::protocol::ag_ui::parse_arguments;
use crate::protocol::UiStreamFrame;
use crate::types::{AgentEvent, AgentEventStream, Part, PartDelta, ToolCallPart, ToolReturn};

/// Text id of the synthetic message that reports a failed run.
pub const ERROR_TEXT_ID: &str = "error-text";

/// Stateful translator for one agent run on the `/chat` endpoint.
///
/// Text lifecycle: the first text part opens a span (`text-start`), text
/// deltas attach to it, end of run closes it (`text-end`). Later text parts
/// reuse the open span, so a run never carries more than one text id.
#[derive(Debug, Default)]
pub struct AgentNodeTranslator {
    ctx: RunContext,
}

impl AgentNodeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Frames for one agent event.
    pub fn on_event(&mut self, event: &AgentEvent) -> Result<Vec<UiStreamFrame>> {
        if self.ctx.is_terminated() {
            debug!("ignoring agent event after end of run");
            return Ok(Vec::new());
        }

        match event {
            AgentEvent::UserPrompt { .. } => Ok(Vec::new()),
            AgentEvent::PartStart { part, .. } => Ok(self.on_part_start(part)),
            AgentEvent::PartDelta { delta, .. } => self.on_part_delta(delta),
            AgentEvent::FunctionToolCall { part } => Ok(vec![self.on_tool_call(part)]),
            AgentEvent::FunctionToolResult { result } => self.on_tool_result(result),
            AgentEvent::End { .. } => Ok(self.finish()),
        }
    }

    fn on_part_start(&mut self, part: &Part) -> Vec<UiStreamFrame> {
        match part {
            Part::Text { content } => {
                let mut frames = Vec::new();
                let id = self.ensure_text_span(&mut frames);
                if !content.is_empty() {
                    frames.push(UiStreamFrame::text_delta(id, content));
                }
                frames
            }
            Part::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => {
                self.ctx.record_tool_call(tool_call_id, Some(tool_name));
                if !args.is_empty() {
                    self.ctx.push_tool_arguments(tool_call_id, args);
                }
                Vec::new()
            }
        }
    }

    fn on_part_delta(&mut self, delta: &PartDelta) -> Result<Vec<UiStreamFrame>> {
        match delta {
            PartDelta::Text { content_delta } => {
                if content_delta.is_empty() {
                    return Ok(Vec::new());
                }
                let mut frames = Vec::new();
                let id = self.ensure_text_span(&mut frames);
                frames.push(UiStreamFrame::text_delta(id, content_delta));
                Ok(frames)
            }
            PartDelta::ToolCall {
                tool_call_id,
                args_delta,
            } => {
                if !self.ctx.push_tool_arguments(tool_call_id, args_delta) {
                    return Err(BridgeError::MalformedEvent(format!(
                        "argument delta for unknown tool call {tool_call_id}"
                    )));
                }
                Ok(Vec::new())
            }
        }
    }

    fn on_tool_call(&mut self, part: &ToolCallPart) -> UiStreamFrame {
        self.ctx
            .record_tool_call(&part.tool_call_id, Some(&part.tool_name));
        self.ctx.announce_tool_call(&part.tool_call_id);
        debug!(tool_call_id = %part.tool_call_id, tool_name = %part.tool_name, "tool input available");
        UiStreamFrame::tool_input_available(&part.tool_call_id, &part.tool_name, part.args.clone())
    }

    fn on_tool_result(&mut self, result: &ToolReturn) -> Result<Vec<UiStreamFrame>> {
        let mut frames = Vec::new();
        let span = self.ctx.tool_call(&result.tool_call_id).cloned().ok_or_else(|| {
            BridgeError::MalformedEvent(format!(
                "result for unknown tool call {}",
                result.tool_call_id
            ))
        })?;

        // Input must precede output for every call id.
        if !span.announced {
            let name = if span.tool_name.is_empty() {
                result.tool_name.as_str()
            } else {
                span.tool_name.as_str()
            };
            frames.push(UiStreamFrame::tool_input_available(
                &span.call_id,
                name,
                parse_arguments(&span.arguments()),
            ));
            self.ctx.announce_tool_call(&span.call_id);
        }

        let output = result.content.normalize()?;
        self.ctx.resolve_tool_call(&result.tool_call_id);
        frames.push(UiStreamFrame::tool_output_available(&result.tool_call_id, output));
        Ok(frames)
    }

    fn ensure_text_span(&mut self, frames: &mut Vec<UiStreamFrame>) -> String {
        if let Some(id) = self.ctx.open_text_id() {
            return id.to_string();
        }
        let id = self.ctx.open_text_span();
        frames.push(UiStreamFrame::text_start(&id));
        id
    }

    /// Close the run: `text-end` for an open span, then nothing more.
    pub fn finish(&mut self) -> Vec<UiStreamFrame> {
        if self.ctx.is_terminated() {
            return Vec::new();
        }
        self.ctx.terminate();
        self.ctx
            .close_text_span()
            .map(UiStreamFrame::text_end)
            .into_iter()
            .collect()
    }

    /// Close the run after a failure: the open span is ended, then the error
    /// is reported as a separate text message.
    pub fn fail(&mut self, error: &BridgeError) -> Vec<UiStreamFrame> {
        if self.ctx.is_terminated() {
            return Vec::new();
        }
        warn!(
            error = %error,
            category = error.category().code(),
            retryable = error.is_retryable(),
            "agent run failed",
        );
        let mut frames = self.finish();
        frames.push(UiStreamFrame::text_start(ERROR_TEXT_ID));
        frames.push(UiStreamFrame::text_delta(
            ERROR_TEXT_ID,
            format!("I apologize, but I encountered an error: {error}"),
        ));
        frames.push(UiStreamFrame::text_end(ERROR_TEXT_ID));
        frames
    }
}

/// Drive an agent run for the `/chat` endpoint.
///
/// Failures never escape: they are reported in-band as an error text
/// message and the stream ends normally. Cancelling `cancel` stops the run
/// without further frames and drops the upstream stream.
pub fn translate_agent_run<F>(
    translator: AgentNodeTranslator,
    invocation: F,
    cancel: CancellationToken,
) -> BoxStream<'static, UiStreamFrame>
where
    F: Future<Output = Result<AgentEventStream>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut translator = translator;
        let mut upstream = match open(invocation, &cancel).await {
            None => {
                info!("client disconnected before agent run started");
                return;
            }
            Some(Ok(upstream)) => upstream,
            Some(Err(e)) => {
                for frame in translator.fail(&e) {
                    yield frame;
                }
                return;
            }
        };

        loop {
            let event = match pull(&mut upstream, &cancel).await {
                Pulled::Item(Ok(event)) => event,
                Pulled::Item(Err(e)) => {
                    for frame in translator.fail(&e) {
                        yield frame;
                    }
                    return;
                }
                Pulled::Exhausted => break,
                Pulled::Cancelled => {
                    info!("client disconnected, releasing agent run");
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
                    for frame in translator.fail(&e) {
                        yield frame;
                    }
                    return;
                }
            }
        }

        if !translator.context().is_terminated() {
            warn!("agent stream ended without end-of-run event");
            for frame in translator.finish() {
                yield frame;
            }
        }
    };

    Box::pin(stream)
}
