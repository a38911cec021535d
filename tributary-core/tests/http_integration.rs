//! Integration tests for the reqwest transport against a mock server

use serde_json::json;
use tributary_core::config::{AdapterConfig, ConnectionConfig};
use tributary_core::http::client::HttpClient;
use tributary_core::http::{HttpRequest, StreamHandle, Transport};
use tributary_core::providers::ProviderError;
use tributary_core::streaming::decode_stream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SSE_BODY: &str = concat!(
    ": keep-alive\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n",
    "\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"He\"}}]}\n",
    "\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"llo\"}}]}\n",
    "\n",
    "data: [DONE]\n",
    "\n",
);

fn chat_request(server: &MockServer) -> HttpRequest {
    HttpRequest::post(
        format!("{}/chat/completions", server.uri()),
        json!({"model": "gpt-4o-mini", "messages": [{"role": "user", "content": "hi"}]}),
    )
    .with_header("Authorization", "Bearer sk-test")
}

async fn drain(handle: &mut Box<dyn StreamHandle>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(unit) = handle.next_unit().await {
        lines.push(unit.unwrap().as_str().to_string());
    }
    lines
}

#[test]
fn test_http_client_creation() {
    assert!(HttpClient::new().is_ok());
    assert!(HttpClient::with_config(&AdapterConfig::default().connection).is_ok());
}

#[tokio::test]
async fn test_send_returns_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client.send(chat_request(&server)).await.unwrap();

    assert!(response.is_success());
    assert!(response.body.contains("\"content\":\"hi\""));
}

#[tokio::test]
async fn test_send_does_not_raise_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "3")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client.send(chat_request(&server)).await.unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(response.headers.get("retry-after").map(String::as_str), Some("3"));
}

#[tokio::test]
async fn test_send_rejects_oversized_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
        .mount(&server)
        .await;

    let config = ConnectionConfig {
        max_response_bytes: 1024,
        ..ConnectionConfig::default()
    };
    let client = HttpClient::with_config(&config).unwrap();
    let err = client.send(chat_request(&server)).await.unwrap_err();

    assert!(matches!(err, ProviderError::ResponseTooLarge { limit: 1024, .. }));
}

#[tokio::test]
async fn test_send_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = chat_request(&server).with_timeout(Duration::from_millis(100));
    let err = client.send(request).await.unwrap_err();

    assert!(matches!(err, ProviderError::Timeout));
}

#[tokio::test]
async fn test_open_stream_yields_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SSE_BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let mut handle = client.open_stream(chat_request(&server)).await.unwrap();
    let lines = drain(&mut handle).await;

    assert_eq!(lines.first().map(String::as_str), Some(": keep-alive"));
    assert!(lines.contains(&"data: [DONE]".to_string()));
    handle.close();
}

#[tokio::test]
async fn test_open_stream_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "Incorrect API key provided"}})),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let err = client.open_stream(chat_request(&server)).await.err().unwrap();

    match err {
        ProviderError::Authentication(message) => {
            assert!(message.contains("Incorrect API key provided"))
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_decoded_stream_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SSE_BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let handle = client.open_stream(chat_request(&server)).await.unwrap();
    let fragments: Vec<String> = decode_stream(handle, Arc::default())
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(fragments, vec!["He", "llo"]);
}
