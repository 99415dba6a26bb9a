//! Translators from upstream model/agent streams to frontend wire frames.
//!
//! Each translator is a synchronous state machine over a [`RunContext`]
//! (one upstream event in, zero or more frames out) plus an async driver
//! that pulls the upstream stream, honours cancellation and turns failures
//! into terminal frames.
//!
//! [`RunContext`]: crate::context::RunContext

pub mod agent_ag_ui;
pub mod agent_node;
pub mod completion;

use std::future::Future;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

pub use agent_ag_ui::{translate_agent_ag_ui, AgentAgUiTranslator};
pub use agent_node::{translate_agent_run, AgentNodeTranslator, ERROR_TEXT_ID};
pub use completion::{translate_completion, CompletionTranslator};

/// Outcome of pulling the upstream once.
pub(crate) enum Pulled<T> {
    Item(T),
    Exhausted,
    Cancelled,
}

/// Await the next upstream item unless the run is cancelled first.
pub(crate) async fn pull<S>(upstream: &mut S, cancel: &CancellationToken) -> Pulled<S::Item>
where
    S: Stream + Unpin,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Pulled::Cancelled,
        item = upstream.next() => match item {
            Some(item) => Pulled::Item(item),
            None => Pulled::Exhausted,
        },
    }
}

/// Await the upstream invocation unless the run is cancelled first.
pub(crate) async fn open<F>(invocation: F, cancel: &CancellationToken) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        opened = invocation => Some(opened),
    }
}
