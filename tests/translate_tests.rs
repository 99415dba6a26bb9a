//! End-to-end translator scenarios driven by scripted upstreams.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use streambridge::agent::AgentRunner;
use streambridge::error::BridgeError;
use streambridge::protocol::{AgUiEvent, UiStreamFrame};
use streambridge::provider::{CompletionRequest, CompletionSource};
use streambridge::translate::*;
use streambridge::types::*;

fn completion_run(
    source: Arc<ScriptedSource>,
    cancel: CancellationToken,
) -> futures::stream::BoxStream<'static, streambridge::error::Result<AgUiEvent>> {
    let request = CompletionRequest::new(vec![ModelMessage::user("hi")]);
    let invocation = async move { source.stream_chunks(&request).await };
    translate_completion(CompletionTranslator::new("t1", "r1"), invocation, cancel)
}

fn chat_run(agent: Arc<ScriptedAgent>) -> futures::stream::BoxStream<'static, UiStreamFrame> {
    let invocation = async move { agent.run("hi".into(), Vec::new()).await };
    translate_agent_run(AgentNodeTranslator::new(), invocation, CancellationToken::new())
}

fn ag_ui_run(agent: Arc<ScriptedAgent>) -> futures::stream::BoxStream<'static, AgUiEvent> {
    let invocation = async move { agent.run("hi".into(), Vec::new()).await };
    translate_agent_ag_ui(
        AgentAgUiTranslator::new("t1", "r1"),
        invocation,
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn completion_text_shares_one_message_id() {
    let source = Arc::new(ScriptedSource::new().queue_text(&["Hello", " world"]));
    let events: Vec<_> = completion_run(source, CancellationToken::new())
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(events.len(), 4);
    assert_eq!(events[0], AgUiEvent::run_started("t1", "r1"));
    let AgUiEvent::TextMessageChunk { message_id, .. } = &events[1] else {
        panic!("expected a text chunk, got {events:?}");
    };
    assert_eq!(events[1], AgUiEvent::text_chunk(message_id, "Hello"));
    assert_eq!(events[2], AgUiEvent::text_chunk(message_id, " world"));
    assert_eq!(events[3], AgUiEvent::run_finished("t1", "r1"));
}

#[tokio::test]
async fn completion_tool_fragments_keep_call_id() {
    let chunks = vec![
        Ok(CompletionChunk::tool_call(ToolCallDelta::start(0, "call_1", "get_weather", ""))),
        Ok(CompletionChunk::tool_call(ToolCallDelta::args(0, "{\"city\":"))),
        Ok(CompletionChunk::tool_call(ToolCallDelta::args(0, "\"Oslo\"}"))),
    ];
    let source = Arc::new(ScriptedSource::new().queue(Script::Items(chunks)));
    let events: Vec<_> = completion_run(source, CancellationToken::new())
        .map(Result::unwrap)
        .collect()
        .await;

    let types: Vec<_> = events.iter().map(AgUiEvent::event_type).collect();
    assert_eq!(
        types,
        vec!["RUN_STARTED", "TOOL_CALL_CHUNK", "TOOL_CALL_CHUNK", "TOOL_CALL_CHUNK", "RUN_FINISHED"]
    );

    let mut args = String::new();
    for (i, event) in events[1..4].iter().enumerate() {
        let AgUiEvent::ToolCallChunk {
            tool_call_id,
            tool_call_name,
            parent_message_id,
            delta,
        } = event
        else {
            unreachable!();
        };
        assert_eq!(tool_call_id, "call_1");
        assert!(parent_message_id.is_some());
        if i == 0 {
            assert_eq!(tool_call_name.as_deref(), Some("get_weather"));
        } else {
            assert!(tool_call_name.is_none());
        }
        args.push_str(delta.as_deref().unwrap_or_default());
    }
    assert_eq!(serde_json::from_str::<serde_json::Value>(&args).unwrap(), json!({"city": "Oslo"}));
}

#[tokio::test]
async fn completion_refused_upstream_reports_run_error() {
    let source = Arc::new(
        ScriptedSource::new().queue(Script::Refuse(BridgeError::upstream("rate limited"))),
    );
    let items: Vec<_> = completion_run(source, CancellationToken::new()).collect().await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap(), &AgUiEvent::run_started("t1", "r1"));
    assert_eq!(items[1].as_ref().unwrap(), &AgUiEvent::run_error("rate limited"));
    assert!(items[2].is_err());
}

#[tokio::test]
async fn completion_mid_stream_failure_keeps_emitted_frames() {
    let source = Arc::new(ScriptedSource::new().queue(Script::Items(vec![
        Ok(CompletionChunk::text("partial")),
        Err(BridgeError::upstream("connection reset")),
        Ok(CompletionChunk::text("never sent")),
    ])));
    let items: Vec<_> = completion_run(source, CancellationToken::new()).collect().await;

    let types: Vec<_> = items
        .iter()
        .map(|item| item.as_ref().map(AgUiEvent::event_type).unwrap_or("ERR"))
        .collect();
    assert_eq!(types, vec!["RUN_STARTED", "TEXT_MESSAGE_CHUNK", "RUN_ERROR", "ERR"]);
    assert!(!items.iter().flatten().any(|e| matches!(e, AgUiEvent::RunFinished { .. })));
}

#[tokio::test]
async fn completion_cancel_stops_without_terminal_frame() {
    let source = Arc::new(
        ScriptedSource::new().queue(Script::Hang(vec![Ok(CompletionChunk::text("Hello"))])),
    );
    let cancel = CancellationToken::new();
    let mut events = completion_run(source.clone(), cancel.clone());

    assert!(matches!(events.next().await, Some(Ok(AgUiEvent::RunStarted { .. }))));
    assert!(matches!(events.next().await, Some(Ok(AgUiEvent::TextMessageChunk { .. }))));
    assert!(!source.released());

    cancel.cancel();
    let rest = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .expect("cancelled run must end promptly");
    assert!(rest.is_none());
    assert!(source.released(), "upstream stream must be dropped on cancel");
}

#[tokio::test]
async fn chat_cancel_releases_agent_stream() {
    let agent = Arc::new(ScriptedAgent::new().queue(Script::Hang(vec![Ok(text_start(0, "Hi"))])));
    let cancel = CancellationToken::new();
    let invocation = {
        let agent = agent.clone();
        async move { agent.run("hi".into(), Vec::new()).await }
    };
    let mut frames = translate_agent_run(AgentNodeTranslator::new(), invocation, cancel.clone());

    assert!(matches!(frames.next().await, Some(UiStreamFrame::TextStart { .. })));
    assert!(matches!(frames.next().await, Some(UiStreamFrame::TextDelta { .. })));
    assert!(!agent.released());

    cancel.cancel();
    let rest = tokio::time::timeout(Duration::from_secs(1), frames.next())
        .await
        .expect("cancelled run must end promptly");
    assert!(rest.is_none());
    assert!(agent.released());
}

#[tokio::test]
async fn completion_interleaved_text_and_tools_keep_upstream_order() {
    let chunks = vec![
        Ok(CompletionChunk::text("Let me check")),
        Ok(CompletionChunk::tool_call(ToolCallDelta::start(0, "call_1", "get_weather", "{\"city\":"))),
        Ok(CompletionChunk::text(" the weather")),
        Ok(CompletionChunk::tool_call(ToolCallDelta::args(0, "\"Oslo\"}"))),
        Ok(CompletionChunk::tool_call(ToolCallDelta::start(1, "call_2", "get_time", "{}"))),
        Ok(CompletionChunk::text(" and the time.")),
    ];
    let source = Arc::new(ScriptedSource::new().queue(Script::Items(chunks)));
    let events: Vec<_> = completion_run(source, CancellationToken::new())
        .map(Result::unwrap)
        .collect()
        .await;

    let types: Vec<_> = events.iter().map(AgUiEvent::event_type).collect();
    assert_eq!(
        types,
        vec![
            "RUN_STARTED",
            "TEXT_MESSAGE_CHUNK",
            "TOOL_CALL_CHUNK",
            "TEXT_MESSAGE_CHUNK",
            "TOOL_CALL_CHUNK",
            "TOOL_CALL_CHUNK",
            "TEXT_MESSAGE_CHUNK",
            "RUN_FINISHED",
        ]
    );

    let AgUiEvent::TextMessageChunk { message_id, .. } = &events[1] else {
        unreachable!();
    };
    let mut text = String::new();
    let mut call_ids = Vec::new();
    for event in &events[1..7] {
        match event {
            AgUiEvent::TextMessageChunk { message_id: id, delta } => {
                assert_eq!(id, message_id);
                text.push_str(delta);
            }
            AgUiEvent::ToolCallChunk {
                tool_call_id,
                parent_message_id,
                ..
            } => {
                assert_eq!(parent_message_id.as_deref(), Some(message_id.as_str()));
                call_ids.push(tool_call_id.as_str());
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
    assert_eq!(text, "Let me check the weather and the time.");
    assert_eq!(call_ids, vec!["call_1", "call_1", "call_2"]);
}

#[tokio::test]
async fn completion_empty_stream_is_start_then_finish() {
    let source = Arc::new(ScriptedSource::new().queue(Script::Items(vec![
        Ok(CompletionChunk::default()),
        Ok(CompletionChunk::text("")),
    ])));
    let events: Vec<_> = completion_run(source, CancellationToken::new())
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(
        events,
        vec![AgUiEvent::run_started("t1", "r1"), AgUiEvent::run_finished("t1", "r1")]
    );
}

#[tokio::test]
async fn chat_plain_answer() {
    let agent = Arc::new(ScriptedAgent::new().queue_events(vec![
        AgentEvent::UserPrompt {
            content: "hi".into(),
        },
        text_start(0, "Hi"),
        end("Hi"),
    ]));
    let frames: Vec<_> = chat_run(agent).collect().await;

    assert_eq!(frames.len(), 3);
    let UiStreamFrame::TextStart { id } = &frames[0] else {
        panic!("expected text-start, got {frames:?}");
    };
    assert_eq!(frames[1], UiStreamFrame::text_delta(id, "Hi"));
    assert_eq!(frames[2], UiStreamFrame::text_end(id));
}

#[tokio::test]
async fn chat_tool_call_then_answer() {
    let agent = Arc::new(ScriptedAgent::new().queue_events(sum_events()));
    let frames: Vec<_> = chat_run(agent).collect().await;

    assert_eq!(
        frames[..2],
        [
            UiStreamFrame::tool_input_available("c1", "sum", json!({"a": 1, "b": 2})),
            UiStreamFrame::tool_output_available("c1", json!(3)),
        ]
    );
    let types: Vec<_> = frames[2..].iter().map(UiStreamFrame::frame_type).collect();
    assert_eq!(types, vec!["text-start", "text-delta", "text-end"]);
}

#[tokio::test]
async fn chat_failure_closes_text_then_reports_error() {
    let agent = Arc::new(ScriptedAgent::new().queue(Script::Items(vec![
        Ok(text_start(0, "Let me")),
        Err(BridgeError::upstream("model overloaded")),
    ])));
    let frames: Vec<_> = chat_run(agent).collect().await;

    let types: Vec<_> = frames.iter().map(UiStreamFrame::frame_type).collect();
    assert_eq!(
        types,
        vec!["text-start", "text-delta", "text-end", "text-start", "text-delta", "text-end"]
    );
    assert_eq!(
        frames[4],
        UiStreamFrame::text_delta(
            ERROR_TEXT_ID,
            "I apologize, but I encountered an error: model overloaded"
        )
    );
}

#[tokio::test]
async fn chat_refused_run_reports_error_text() {
    let agent = Arc::new(
        ScriptedAgent::new().queue(Script::Refuse(BridgeError::Authentication("bad key".into()))),
    );
    let frames: Vec<_> = chat_run(agent).collect().await;
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], UiStreamFrame::text_start(ERROR_TEXT_ID));
    assert_eq!(frames[2], UiStreamFrame::text_end(ERROR_TEXT_ID));
}

#[tokio::test]
async fn chat_stream_without_end_is_closed() {
    let agent = Arc::new(ScriptedAgent::new().queue_events(vec![text_start(0, "cut")]));
    let frames: Vec<_> = chat_run(agent).collect().await;
    let types: Vec<_> = frames.iter().map(UiStreamFrame::frame_type).collect();
    assert_eq!(types, vec!["text-start", "text-delta", "text-end"]);
}

#[tokio::test]
async fn ag_ui_agent_run_brackets_tool_calls() {
    let agent = Arc::new(ScriptedAgent::new().queue_events(sum_events()));
    let events: Vec<_> = ag_ui_run(agent).collect().await;

    let types: Vec<_> = events.iter().map(AgUiEvent::event_type).collect();
    assert_eq!(
        types,
        vec![
            "RUN_STARTED",
            "TOOL_CALL_START",
            "TOOL_CALL_ARGS",
            "TOOL_CALL_END",
            "TOOL_CALL_RESULT",
            "TEXT_MESSAGE_START",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_END",
            "RUN_FINISHED",
        ]
    );
    let AgUiEvent::ToolCallResult { content, role, .. } = &events[4] else {
        unreachable!();
    };
    assert_eq!(content, "3");
    assert_eq!(role, "tool");
}

#[tokio::test]
async fn ag_ui_agent_failure_is_run_error() {
    let agent = Arc::new(ScriptedAgent::new().queue(Script::Items(vec![
        Ok(text_start(0, "Hi")),
        Err(BridgeError::upstream("boom")),
    ])));
    let events: Vec<_> = ag_ui_run(agent).collect().await;
    assert_eq!(events.last(), Some(&AgUiEvent::run_error("boom")));
    assert!(!events.iter().any(|e| matches!(e, AgUiEvent::RunFinished { .. })));
}
