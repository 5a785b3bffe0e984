//! Integration tests for `CompletionClient` using wiremock HTTP mocks.

use stintel_core::{CompletionError, CompletionRequest, LlmProvider, TextCompletion};
use stintel_llm::CompletionClient;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest::new("Summarize the week.", 0.8, 500)
}

#[tokio::test]
async fn openai_returns_first_choice_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "max_tokens": 500,
            "messages": [
                {"role": "system", "content": "You are a startup intelligence analyst."},
                {"role": "user", "content": "Summarize the week."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "AI funding is hot."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::with_base_url(
        LlmProvider::OpenAi,
        "gpt-4o-mini",
        Some("sk-test".into()),
        5,
        &server.uri(),
    )
    .expect("client");

    let text = client.complete(&request()).await.expect("completion");
    assert_eq!(text, "AI funding is hot.");
    assert_eq!(client.model(), "gpt-4o-mini");
}

#[tokio::test]
async fn anthropic_sends_version_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ak-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "Three trends stand out."}]
        })))
        .mount(&server)
        .await;

    let client = CompletionClient::with_base_url(
        LlmProvider::Anthropic,
        "claude-3-5-haiku-latest",
        Some("ak-test".into()),
        5,
        &server.uri(),
    )
    .expect("client");

    let text = client.complete(&request()).await.expect("completion");
    assert_eq!(text, "Three trends stand out.");
}

#[tokio::test]
async fn missing_key_is_not_configured_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client =
        CompletionClient::with_base_url(LlmProvider::OpenAi, "gpt-4o-mini", None, 5, &server.uri())
            .expect("client");
    let err = client.complete(&request()).await.unwrap_err();
    assert!(err.is_not_configured());
}

#[tokio::test]
async fn error_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = CompletionClient::with_base_url(
        LlmProvider::OpenAi,
        "gpt-4o-mini",
        Some("sk-test".into()),
        5,
        &server.uri(),
    )
    .expect("client");
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, CompletionError::Unavailable(msg) if msg.contains("429")));
}

#[tokio::test]
async fn empty_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&server)
        .await;

    let client = CompletionClient::with_base_url(
        LlmProvider::OpenAi,
        "gpt-4o-mini",
        Some("sk-test".into()),
        5,
        &server.uri(),
    )
    .expect("client");
    let err = client.complete(&request()).await.unwrap_err();
    assert!(matches!(err, CompletionError::InvalidResponse(_)));
}
