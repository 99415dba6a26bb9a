//! Server-Sent Events framing.

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// Content type of an SSE response.
pub const SSE_CONTENT_TYPE: &str = "text/event-stream";

/// Media type AG-UI clients send when they prefer binary protobuf framing.
pub const AG_UI_PROTO_CONTENT_TYPE: &str = "application/vnd.ag-ui.event+proto";

/// Pick the response content type for an `Accept` header.
///
/// Only SSE framing is implemented; a client asking for protobuf framing
/// gets SSE, which every AG-UI client also understands.
pub fn negotiate_content_type(accept: Option<&str>) -> &'static str {
    if let Some(accept) = accept {
        if accept.contains(AG_UI_PROTO_CONTENT_TYPE) {
            debug!(accept, "protobuf framing requested, answering with SSE");
        }
    }
    SSE_CONTENT_TYPE
}

/// Encode one frame as `data: <json>\n\n`.
pub fn encode_frame<T: Serialize + ?Sized>(frame: &T) -> Result<Bytes> {
    let json = serde_json::to_string(frame)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// Split an SSE body back into the JSON payload of each `data:` line.
///
/// Used by clients of the bridge and by tests; unparseable lines are skipped.
pub fn decode_frames(body: &str) -> Vec<serde_json::Value> {
    body.split("\n\n")
        .filter_map(|block| {
            block
                .lines()
                .find_map(|line| line.strip_prefix("data: "))
                .and_then(|data| serde_json::from_str(data).ok())
        })
        .collect()
}
