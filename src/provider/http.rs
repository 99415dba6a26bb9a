//! Shared HTTP client, SSE line handling and status mapping.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{BridgeError, Result};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// No overall request timeout: completions stream for as long as the model
/// keeps talking, and a disconnecting client drops the body instead.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Headers for a Bearer-token API returning an event stream.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Payload of an SSE `data:` line. `None` for other lines and for `[DONE]`.
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line
        .strip_prefix("data:")
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))?;
    if data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Split complete lines off the front of `buffer`, leaving any partial line.
///
/// Only complete lines are decoded, so a character split across network
/// reads stays intact. A complete line that is not UTF-8 is malformed.
pub fn drain_lines(buffer: &mut Vec<u8>) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
        let line = std::str::from_utf8(&raw)
            .map_err(|e| BridgeError::MalformedEvent(format!("stream line is not UTF-8: {e}")))?;
        lines.push(line.trim().to_string());
    }
    Ok(lines)
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> BridgeError {
    match status {
        401 | 403 => BridgeError::Authentication(body.to_string()),
        429 => BridgeError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => BridgeError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
