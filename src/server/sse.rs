//! Streaming SSE responses.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::DropGuard;
use tracing::debug;

use crate::error::Result;

/// Wrap encoded frames in a streaming response.
///
/// The body owns `guard`: when the client disconnects the body is dropped,
/// which cancels the run. An `Err` item aborts the body so the client sees
/// the connection close in an error state.
pub fn sse_response<S>(content_type: &'static str, frames: S, guard: DropGuard) -> Response
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    let body = async_stream::stream! {
        let _guard = guard;
        futures::pin_mut!(frames);
        while let Some(frame) = frames.next().await {
            yield frame;
        }
        debug!("sse body complete");
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(body)).into_response()
}

/// SSE response for the AI SDK UI message stream.
pub fn ui_stream_response<S>(frames: S, guard: DropGuard) -> Response
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    let mut response = sse_response(crate::protocol::SSE_CONTENT_TYPE, frames, guard);
    response.headers_mut().insert(
        HeaderName::from_static("x-vercel-ai-ui-message-stream"),
        HeaderValue::from_static("v1"),
    );
    response
}
