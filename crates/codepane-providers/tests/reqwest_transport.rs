//! Integration tests for the reqwest transport against a mock backend

use std::sync::Arc;
use std::time::Duration;

use codepane_providers::{
    CodeGenAdapter, HttpTransport, ProfileOverrides, ProviderError, ProviderProfile,
    ReqwestTransport, WireFormat,
};
use mockito::Matcher;
use serde_json::json;

fn profile(id: &str, base_url: String) -> ProviderProfile {
    ProviderProfile::layered(
        id,
        &[&ProfileOverrides {
            base_url: Some(base_url),
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }],
    )
}

fn adapter() -> CodeGenAdapter {
    let transport = ReqwestTransport::with_timeout(Duration::from_secs(5)).unwrap();
    CodeGenAdapter::new(Arc::new(transport))
}

/// Test: OpenAI-style request reaches the chat completions endpoint
#[tokio::test]
async fn test_openai_generation_with_mock() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1/", server.url());

    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "gpt-4.1-mini", "max_tokens": 800})),
            Matcher::Regex("make a counter".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Sure:\n```javascript\nlet count = 0;\ncount++;\n```"}
            }]
        }"#,
        )
        .create_async()
        .await;

    let code = adapter()
        .send(&profile("openai", base_url), "make a counter")
        .await
        .unwrap();

    assert_eq!(code, "let count = 0;\ncount++;");
    mock.assert_async().await;
}

/// Test: Anthropic-style request uses key and version headers
#[tokio::test]
async fn test_anthropic_generation_with_mock() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());

    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"content":[{"type":"text","text":"console.log('hi');"}]}"#)
        .create_async()
        .await;

    let anthropic = profile("anthropic", base_url);
    assert_eq!(anthropic.wire_format, WireFormat::Anthropic);

    let code = adapter().send(&anthropic, "say hi").await.unwrap();
    assert_eq!(code, "console.log('hi');");
    mock.assert_async().await;
}

/// Test: Non-success status carries the response body
#[tokio::test]
async fn test_http_error_status_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let result = adapter()
        .send(&profile("openai", server.url()), "anything")
        .await;

    let err = result.unwrap_err();
    assert_eq!(
        err,
        ProviderError::HttpStatus {
            status: 429,
            body: "rate limited".to_string()
        }
    );
    assert_eq!(err.to_string(), "Request failed (429): rate limited");
}

/// Test: Unreachable backend is a network error
#[tokio::test]
async fn test_connection_failure_is_network_error() {
    let result = adapter()
        .send(&profile("openai", "http://127.0.0.1:9".to_string()), "anything")
        .await;

    assert!(matches!(result, Err(ProviderError::NetworkError(_))));
}

/// Test: A caller-supplied client keeps its own defaults
#[tokio::test]
async fn test_transport_with_custom_client() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/echo")
        .match_header("user-agent", "codepane-widget/1.0")
        .match_header("x-trace", "abc")
        .match_body("{}")
        .with_status(202)
        .with_body("accepted")
        .create_async()
        .await;

    let client = reqwest::Client::builder()
        .user_agent("codepane-widget/1.0")
        .build()
        .unwrap();
    let transport = ReqwestTransport::with_client(client);

    let response = transport
        .post(
            &format!("{}/echo", server.url()),
            &[("x-trace".to_string(), "abc".to_string())],
            "{}".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 202);
    assert!(response.is_success());
    assert_eq!(response.body.as_deref(), Some("accepted"));
    mock.assert_async().await;
}
