//! Completion chunks to AG-UI `RUN_STARTED` / chunk / `RUN_FINISHED` frames.

use std::future::Future;

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::{open, pull, Pulled};
use crate::context::RunContext;
use crate::error::{BridgeError, Result};
use crate::protocol::AgUiEvent;
use crate::types::{ChunkStream, CompletionChunk, ToolCallDelta};

/// Stateful translator for one completion run.
///
/// Every text fragment of the run is attributed to a single message id, and
/// every tool-call fragment names that message as its parent.
#[derive(Debug)]
pub struct CompletionTranslator {
    thread_id: String,
    run_id: String,
    message_id: String,
    started: bool,
    ctx: RunContext,
}

impl CompletionTranslator {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            message_id: Uuid::new_v4().to_string(),
            started: false,
            ctx: RunContext::new(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// The `RUN_STARTED` frame. Emitted once; later calls return `None`.
    pub fn start(&mut self) -> Option<AgUiEvent> {
        if self.started || self.ctx.is_terminated() {
            return None;
        }
        self.started = true;
        info!(thread_id = %self.thread_id, run_id = %self.run_id, "completion run started");
        Some(AgUiEvent::run_started(&self.thread_id, &self.run_id))
    }

    /// Frames for one upstream chunk, in chunk order: the text fragment
    /// first, then each tool-call fragment. Empty chunks yield nothing.
    pub fn on_chunk(&mut self, chunk: &CompletionChunk) -> Result<Vec<AgUiEvent>> {
        if self.ctx.is_terminated() {
            return Ok(Vec::new());
        }
        if chunk.is_empty() {
            trace!(run_id = %self.run_id, "dropping empty chunk");
            return Ok(Vec::new());
        }

        let mut frames = Vec::with_capacity(1 + chunk.tool_calls.len());
        if let Some(text) = chunk.text_content() {
            frames.push(AgUiEvent::text_chunk(&self.message_id, text));
        }
        for delta in chunk.tool_calls.iter().filter(|d| !d.is_empty()) {
            frames.push(self.on_tool_call_delta(delta)?);
        }
        Ok(frames)
    }

    fn on_tool_call_delta(&mut self, delta: &ToolCallDelta) -> Result<AgUiEvent> {
        let call_id = match delta.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                self.ctx.bind_call_index(delta.index, id);
                id.to_string()
            }
            None => self
                .ctx
                .call_id_for_index(delta.index)
                .map(str::to_string)
                .ok_or_else(|| {
                    BridgeError::MalformedEvent(format!(
                        "tool call fragment at index {} has no call id",
                        delta.index
                    ))
                })?,
        };

        let name = delta.name.as_deref().filter(|n| !n.is_empty());
        self.ctx.record_tool_call(&call_id, name);
        if let Some(args) = delta.arguments.as_deref() {
            self.ctx.push_tool_arguments(&call_id, args);
        }

        Ok(AgUiEvent::ToolCallChunk {
            tool_call_id: call_id,
            tool_call_name: name.map(str::to_string),
            parent_message_id: Some(self.message_id.clone()),
            delta: delta.arguments.clone(),
        })
    }

    /// The `RUN_FINISHED` frame, unless the run already ended.
    pub fn finish(&mut self) -> Option<AgUiEvent> {
        if self.ctx.is_terminated() {
            return None;
        }
        self.ctx.terminate();
        for call in self.ctx.tool_calls() {
            debug!(
                run_id = %self.run_id,
                tool_call_id = %call.call_id,
                tool_name = %call.tool_name,
                arguments = %call.arguments(),
                "tool call streamed"
            );
        }
        info!(thread_id = %self.thread_id, run_id = %self.run_id, "completion run finished");
        Some(AgUiEvent::run_finished(&self.thread_id, &self.run_id))
    }

    /// The `RUN_ERROR` frame for a failure, unless the run already ended.
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
            "completion run failed",
        );
        Some(AgUiEvent::run_error(error.to_string()))
    }
}

/// Drive a completion run to completion.
///
/// `invocation` opens the upstream chunk stream; it is awaited only after
/// `RUN_STARTED` has been yielded. On failure the stream yields `RUN_ERROR`
/// and then the error itself, so the transport can close the connection in
/// an error state. Cancelling `cancel` stops the run without further frames
/// and drops the upstream stream.
pub fn translate_completion<F>(
    translator: CompletionTranslator,
    invocation: F,
    cancel: CancellationToken,
) -> BoxStream<'static, Result<AgUiEvent>>
where
    F: Future<Output = Result<ChunkStream>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut translator = translator;
        if let Some(frame) = translator.start() {
            yield Ok(frame);
        }

        let mut upstream = match open(invocation, &cancel).await {
            None => {
                info!(run_id = %translator.run_id, "client disconnected before upstream opened");
                return;
            }
            Some(Ok(upstream)) => upstream,
            Some(Err(e)) => {
                if let Some(frame) = translator.fail(&e) {
                    yield Ok(frame);
                }
                yield Err(e);
                return;
            }
        };

        loop {
            let chunk = match pull(&mut upstream, &cancel).await {
                Pulled::Item(Ok(chunk)) => chunk,
                Pulled::Item(Err(e)) => {
                    if let Some(frame) = translator.fail(&e) {
                        yield Ok(frame);
                    }
                    yield Err(e);
                    return;
                }
                Pulled::Exhausted => break,
                Pulled::Cancelled => {
                    info!(run_id = %translator.run_id, "client disconnected, releasing upstream");
                    return;
                }
            };

            match translator.on_chunk(&chunk) {
                Ok(frames) => {
                    for frame in frames {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    if let Some(frame) = translator.fail(&e) {
                        yield Ok(frame);
                    }
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(frame) = translator.finish() {
            yield Ok(frame);
        }
    };

    Box::pin(stream)
}
