//! Per-run span bookkeeping shared by the translators.

use indexmap::IndexMap;
use uuid::Uuid;

/// The single text span a run may have open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub id: String,
    pub opened: bool,
}

/// A tool call observed in the upstream stream, keyed by its call id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallSpan {
    pub call_id: String,
    pub tool_name: String,
    pub argument_fragments: Vec<String>,
    /// Input frame already emitted for this call.
    pub announced: bool,
    pub resolved: bool,
}

impl ToolCallSpan {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            ..Default::default()
        }
    }

    /// Concatenation of every argument fragment seen so far.
    pub fn arguments(&self) -> String {
        self.argument_fragments.concat()
    }
}

/// State scoped to one request/response lifecycle.
///
/// Every field exists from construction; nothing is attached mid-stream.
#[derive(Debug, Default)]
pub struct RunContext {
    text: Option<TextSpan>,
    text_spans_opened: usize,
    tool_calls: IndexMap<String, ToolCallSpan>,
    call_ids_by_index: IndexMap<u32, String>,
    terminated: bool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently open text span, if any.
    pub fn open_text(&self) -> Option<&TextSpan> {
        self.text.as_ref().filter(|span| span.opened)
    }

    /// Id of the currently open text span.
    pub fn open_text_id(&self) -> Option<&str> {
        self.open_text().map(|span| span.id.as_str())
    }

    /// Open a fresh text span and return its id. Any previous span must have
    /// been closed first; the single-active-text invariant is the caller's.
    pub fn open_text_span(&mut self) -> String {
        debug_assert!(self.open_text().is_none(), "text span already open");
        let id = format!("text-{}", Uuid::new_v4().simple());
        self.text = Some(TextSpan {
            id: id.clone(),
            opened: true,
        });
        self.text_spans_opened += 1;
        id
    }

    /// Close the open text span, returning its id.
    pub fn close_text_span(&mut self) -> Option<String> {
        let span = self.text.take().filter(|span| span.opened)?;
        Some(span.id)
    }

    /// How many text spans this run has opened.
    pub fn text_spans_opened(&self) -> usize {
        self.text_spans_opened
    }

    /// Register a tool call the first time its id is seen. Later calls with
    /// the same id only merge in a name that was missing.
    pub fn record_tool_call(&mut self, call_id: &str, tool_name: Option<&str>) -> &mut ToolCallSpan {
        let span = self
            .tool_calls
            .entry(call_id.to_string())
            .or_insert_with(|| ToolCallSpan::new(call_id, ""));
        if let Some(name) = tool_name.filter(|n| !n.is_empty()) {
            if span.tool_name.is_empty() {
                span.tool_name = name.to_string();
            }
        }
        span
    }

    /// Bind a provider stream index to a call id.
    pub fn bind_call_index(&mut self, index: u32, call_id: &str) {
        self.call_ids_by_index.insert(index, call_id.to_string());
    }

    /// Call id previously bound to a provider stream index.
    pub fn call_id_for_index(&self, index: u32) -> Option<&str> {
        self.call_ids_by_index.get(&index).map(String::as_str)
    }

    /// Append an argument fragment to a known call.
    pub fn push_tool_arguments(&mut self, call_id: &str, fragment: &str) -> bool {
        match self.tool_calls.get_mut(call_id) {
            Some(span) => {
                span.argument_fragments.push(fragment.to_string());
                true
            }
            None => false,
        }
    }

    /// Mark a call's input as emitted. Returns false for an unknown id.
    pub fn announce_tool_call(&mut self, call_id: &str) -> bool {
        match self.tool_calls.get_mut(call_id) {
            Some(span) => {
                span.announced = true;
                true
            }
            None => false,
        }
    }

    /// Mark a call as answered. Returns false for an unknown id.
    pub fn resolve_tool_call(&mut self, call_id: &str) -> bool {
        match self.tool_calls.get_mut(call_id) {
            Some(span) => {
                span.resolved = true;
                true
            }
            None => false,
        }
    }

    pub fn tool_call(&self, call_id: &str) -> Option<&ToolCallSpan> {
        self.tool_calls.get(call_id)
    }

    /// Tool calls in arrival order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallSpan> {
        self.tool_calls.values()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }
}
