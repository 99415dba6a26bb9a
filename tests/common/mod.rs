//! Shared test helpers: scripted completion sources and agents.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use streambridge::agent::AgentRunner;
use streambridge::error::{BridgeError, Result};
use streambridge::provider::{CompletionRequest, CompletionSource};
use streambridge::types::*;

/// What one `stream_chunks` / `run` call should produce.
pub enum Script<T> {
    /// Yield these items, then end.
    Items(Vec<Result<T>>),
    /// Yield these items, then never end (until dropped).
    Hang(Vec<Result<T>>),
    /// Fail before any stream is returned.
    Refuse(BridgeError),
}

/// Sets its flag when dropped, i.e. when the stream holding it is released.
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn scripted_stream<T: Send + 'static>(
    script: Script<T>,
    released: Arc<AtomicBool>,
) -> Result<futures::stream::BoxStream<'static, Result<T>>> {
    let (items, hang) = match script {
        Script::Items(items) => (items, false),
        Script::Hang(items) => (items, true),
        Script::Refuse(e) => return Err(e),
    };
    let release = ReleaseFlag(released);
    let stream = async_stream::stream! {
        let _release = release;
        for item in items {
            yield item;
        }
        if hang {
            futures::future::pending::<()>().await;
        }
    };
    Ok(Box::pin(stream))
}

/// A completion source that replays queued scripts, one per request.
pub struct ScriptedSource {
    scripts: Mutex<Vec<Script<CompletionChunk>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    released: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn queue(self, script: Script<CompletionChunk>) -> Self {
        self.scripts.lock().unwrap().push(script);
        self
    }

    /// Queue a plain text answer split into the given fragments.
    pub fn queue_text(self, fragments: &[&str]) -> Self {
        let items = fragments
            .iter()
            .map(|f| Ok(CompletionChunk::text(*f)))
            .collect();
        self.queue(Script::Items(items))
    }

    /// Queue a single complete tool call.
    pub fn queue_tool_call(self, id: &str, name: &str, args: serde_json::Value) -> Self {
        let chunk = CompletionChunk::tool_call(ToolCallDelta::start(0, id, name, args.to_string()));
        self.queue(Script::Items(vec![Ok(chunk)]))
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// True once a chunk stream handed out by this source has been dropped.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionSource for ScriptedSource {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn stream_chunks(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        self.requests.lock().unwrap().push(request.clone());
        let mut scripts = self.scripts.lock().unwrap();
        let script = if scripts.is_empty() {
            Script::Items(vec![Ok(CompletionChunk::text("Mock response"))])
        } else {
            scripts.remove(0)
        };
        scripted_stream(script, self.released.clone())
    }
}

/// An agent that replays queued event scripts, one per run.
pub struct ScriptedAgent {
    scripts: Mutex<Vec<Script<AgentEvent>>>,
    runs: Mutex<Vec<(String, Vec<ModelMessage>)>>,
    released: Arc<AtomicBool>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            runs: Mutex::new(Vec::new()),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn queue(self, script: Script<AgentEvent>) -> Self {
        self.scripts.lock().unwrap().push(script);
        self
    }

    pub fn queue_events(self, events: Vec<AgentEvent>) -> Self {
        self.queue(Script::Items(events.into_iter().map(Ok).collect()))
    }

    /// `(prompt, history)` of every run so far.
    pub fn runs(&self) -> Vec<(String, Vec<ModelMessage>)> {
        self.runs.lock().unwrap().clone()
    }

    /// True once an event stream handed out by this agent has been dropped.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRunner for ScriptedAgent {
    async fn run(&self, prompt: String, history: Vec<ModelMessage>) -> Result<AgentEventStream> {
        self.runs.lock().unwrap().push((prompt, history));
        let mut scripts = self.scripts.lock().unwrap();
        let script = if scripts.is_empty() {
            Script::Items(vec![Ok(AgentEvent::End {
                output: String::new(),
            })])
        } else {
            scripts.remove(0)
        };
        scripted_stream(script, self.released.clone())
    }
}

// Agent event builders

pub fn text_start(index: usize, content: &str) -> AgentEvent {
    AgentEvent::PartStart {
        index,
        part: Part::Text {
            content: content.to_string(),
        },
    }
}

pub fn text_delta(index: usize, delta: &str) -> AgentEvent {
    AgentEvent::PartDelta {
        index,
        delta: PartDelta::Text {
            content_delta: delta.to_string(),
        },
    }
}

pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> AgentEvent {
    AgentEvent::FunctionToolCall {
        part: ToolCallPart {
            tool_call_id: id.to_string(),
            tool_name: name.to_string(),
            args,
        },
    }
}

pub fn tool_result(id: &str, name: &str, output: serde_json::Value) -> AgentEvent {
    AgentEvent::FunctionToolResult {
        result: ToolReturn {
            tool_call_id: id.to_string(),
            tool_name: name.to_string(),
            content: ToolOutput::plain(output),
        },
    }
}

pub fn end(output: &str) -> AgentEvent {
    AgentEvent::End {
        output: output.to_string(),
    }
}

/// The sum tool events for `{"a": 1, "b": 2}`.
pub fn sum_events() -> Vec<AgentEvent> {
    vec![
        AgentEvent::UserPrompt {
            content: "add 1 and 2".into(),
        },
        tool_call("c1", "sum", json!({"a": 1, "b": 2})),
        tool_result("c1", "sum", json!(3)),
        text_start(0, "The sum is 3."),
        end("The sum is 3."),
    ]
}
