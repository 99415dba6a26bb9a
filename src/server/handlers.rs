//! Request handlers for the bridge endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::error::ApiError;
use super::sse::{sse_response, ui_stream_response};
use crate::agent::AgentRunner;
use crate::history::{convert_chat_messages, ChatMessageRequest};
use crate::protocol::{encode_frame, negotiate_content_type, RunAgentInput};
use crate::provider::{CompletionRequest, CompletionSource};
use crate::translate::{
    translate_agent_ag_ui, translate_agent_run, translate_completion, AgentAgUiTranslator,
    AgentNodeTranslator, CompletionTranslator,
};

/// State for the completion server.
#[derive(Clone)]
pub struct CompletionState {
    pub source: Arc<dyn CompletionSource>,
}

/// State for the agent server.
#[derive(Clone)]
pub struct AgentState {
    pub agent: Arc<dyn AgentRunner>,
    pub system_prompt: Option<String>,
}

fn decode_run_input(body: &[u8]) -> Result<RunAgentInput, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::unprocessable(&e))
}

fn accept(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ACCEPT).and_then(|v| v.to_str().ok())
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// `POST /` in completion mode: stream raw completion chunks as AG-UI events.
pub async fn completion_run(
    State(state): State<CompletionState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let input = decode_run_input(&body)?;
    info!(
        thread_id = %input.thread_id,
        run_id = %input.run_id,
        messages = input.messages.len(),
        tools = input.tools.len(),
        "completion request"
    );

    let request = CompletionRequest::new(input.to_model_messages()).with_tools(input.tool_definitions());
    let source = state.source.clone();
    let invocation = async move { source.stream_chunks(&request).await };

    let cancel = CancellationToken::new();
    let translator = CompletionTranslator::new(&input.thread_id, &input.run_id);
    let frames = translate_completion(translator, invocation, cancel.clone())
        .map(|item| item.and_then(|event| encode_frame(&event)));

    Ok(sse_response(
        negotiate_content_type(accept(&headers)),
        frames,
        cancel.drop_guard(),
    ))
}

/// `POST /` in agent mode: run the agent and stream AG-UI events.
pub async fn agent_run(
    State(state): State<AgentState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let input = decode_run_input(&body)?;
    info!(thread_id = %input.thread_id, run_id = %input.run_id, "agent request");

    let (prompt, history) = input.split_prompt();
    let agent = state.agent.clone();
    let invocation = async move { agent.run(prompt, history).await };

    let cancel = CancellationToken::new();
    let translator = AgentAgUiTranslator::new(&input.thread_id, &input.run_id);
    let frames = translate_agent_ag_ui(translator, invocation, cancel.clone())
        .map(|event| encode_frame(&event));

    Ok(sse_response(
        negotiate_content_type(accept(&headers)),
        frames,
        cancel.drop_guard(),
    ))
}

/// `POST /chat`: run the agent for a `useChat` client and stream UI frames.
pub async fn agent_chat(State(state): State<AgentState>, body: Bytes) -> Response {
    let request = ChatMessageRequest::from_slice(&body);
    let (prompt, history) =
        convert_chat_messages(&request.messages, state.system_prompt.as_deref());
    info!(messages = request.messages.len(), history = history.len(), "chat request");

    let agent = state.agent.clone();
    let invocation = async move { agent.run(prompt, history).await };

    let cancel = CancellationToken::new();
    let frames = translate_agent_run(AgentNodeTranslator::new(), invocation, cancel.clone())
        .map(|frame| encode_frame(&frame));

    ui_stream_response(frames, cancel.drop_guard())
}
