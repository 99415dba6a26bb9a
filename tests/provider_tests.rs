#![cfg(feature = "openai")]

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use streambridge::error::BridgeError;
use streambridge::provider::{CompletionRequest, CompletionSource, OpenAiCompatibleSource};
use streambridge::types::{CompletionChunk, ModelMessage, ToolCallDelta};

fn source(server: &MockServer) -> OpenAiCompatibleSource {
    OpenAiCompatibleSource::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .model("test-model")
        .build()
}

fn request() -> CompletionRequest {
    CompletionRequest::new(vec![ModelMessage::user("Hello")])
}

fn sse_body(payloads: &[serde_json::Value]) -> String {
    let mut body = String::from(": keep-alive\n\n");
    for payload in payloads {
        body.push_str(&format!("data: {payload}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn streams_text_and_tool_fragments() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hel"}}]}),
        json!({"choices": [{"index": 0, "delta": {"content": "lo"}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "id": "call_1", "type": "function", "function": {"name": "get_weather", "arguments": ""}}]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{\"city\":\"Oslo\"}"}}]}}]}),
        json!({"choices": [], "usage": {"total_tokens": 12}}),
    ]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "test-model", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let chunks: Vec<_> = source(&server)
        .stream_chunks(&request())
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(
        chunks,
        vec![
            CompletionChunk::text("Hel"),
            CompletionChunk::text("lo"),
            CompletionChunk::tool_call(ToolCallDelta::start(0, "call_1", "get_weather", "")),
            CompletionChunk::tool_call(ToolCallDelta::args(0, "{\"city\":\"Oslo\"}")),
        ]
    );
}

#[tokio::test]
async fn unauthorized_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = source(&server).stream_chunks(&request()).await.err().unwrap();
    assert!(matches!(err, BridgeError::Authentication(ref m) if m == "invalid api key"));
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"error": {"retry_after": 2}})),
        )
        .mount(&server)
        .await;

    let err = source(&server).stream_chunks(&request()).await.err().unwrap();
    assert!(matches!(
        err,
        BridgeError::RateLimited {
            retry_after_ms: Some(2000)
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn inline_error_ends_stream_with_upstream_failure() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        json!({"choices": [{"delta": {"content": "Hi"}}]}),
        json!({"error": {"message": "quota exceeded"}}),
    ]);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let items: Vec<_> = source(&server)
        .stream_chunks(&request())
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(&items[1], Err(BridgeError::Upstream(m)) if m == "quota exceeded"));
}

#[tokio::test]
async fn missing_api_key_fails_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let source = OpenAiCompatibleSource::new(None, server.uri(), "test-model");
    let err = source.stream_chunks(&request()).await.err().unwrap();
    assert!(matches!(err, BridgeError::Authentication(_)));
}

#[tokio::test]
async fn character_split_across_network_reads_is_preserved() {
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n\ndata: [DONE]\n\n";
    let bytes = body.as_bytes().to_vec();
    let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 8192];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        socket.write_all(&bytes[..split]).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        socket.write_all(&bytes[split..]).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    let source = OpenAiCompatibleSource::new(Some("k".into()), format!("http://{addr}"), "m");
    let chunks: Vec<_> = source
        .stream_chunks(&request())
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(chunks, vec![CompletionChunk::text("café")]);
}
