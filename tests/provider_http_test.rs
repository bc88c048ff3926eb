//! HTTP adapter tests against a mock backend.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use grapheus::error::ErrorKind;
use grapheus::provider::auth::Credential;
use grapheus::provider::{
    GenerationRequest, HttpGenerator, Message, ProviderKind, TextGenerator, generate_with_retry,
};

fn request() -> GenerationRequest {
    GenerationRequest::new(
        "test-model",
        vec![
            Message::system("Write commit messages."),
            Message::user("status and diff here"),
        ],
    )
}

async fn adapter(server: &MockServer, kind: ProviderKind) -> HttpGenerator {
    HttpGenerator::with_endpoint(
        kind,
        format!("{}/v1/chat/completions", server.uri()),
        Credential::Key("test-key".into()),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn chat_response(content: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn test_successful_generation_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(chat_response(json!("feat: add retry policy")))
        .expect(1)
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let text = generator.generate(&request()).await.unwrap();
    assert_eq!(text, "feat: add retry policy");
}

#[tokio::test]
async fn test_http_429_is_rate_limit_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let err = generator.generate(&request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimit);
}

#[tokio::test]
async fn test_http_401_is_authentication_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let err = generator.generate(&request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
}

#[tokio::test]
async fn test_http_404_is_model_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such model"))
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let err = generator.generate(&request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Model);
}

#[tokio::test]
async fn test_http_500_is_connection_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream sad"))
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let err = generator.generate(&request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Connection);
}

#[tokio::test]
async fn test_error_excerpt_redacts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"error": "invalid api_key = 'sk-abcdef1234567890abcd'"}"#),
        )
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let err = generator.generate(&request()).await.unwrap_err();
    assert!(!err.message.contains("sk-abcdef1234567890abcd"));
}

#[tokio::test]
async fn test_null_content_is_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_response(json!(null)))
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let err = generator.generate(&request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Model);
    assert!(err.message.contains("null content"));
}

#[tokio::test]
async fn test_empty_content_is_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_response(json!("   ")))
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let err = generator.generate(&request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Model);
    assert!(err.message.contains("empty content"));
}

#[tokio::test]
async fn test_typed_parts_content_shape_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_response(json!([
            {"type": "text", "text": "fix: "},
            {"type": "text", "text": "handle typed parts"}
        ])))
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    let text = generator.generate(&request()).await.unwrap();
    assert_eq!(text, "fix: handle typed parts");
}

#[tokio::test]
async fn test_messages_style_parses_anthropic_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "docs: expand readme"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Anthropic).await;
    let text = generator.generate(&request()).await.unwrap();
    assert_eq!(text, "docs: expand readme");
}

#[tokio::test]
async fn test_retry_recovers_from_transient_429() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(chat_response(json!("feat: survive a rate limit")))
        .expect(1)
        .mount(&server)
        .await;

    let generator = adapter(&server, ProviderKind::Groq).await;
    // One 2s backoff between the two attempts.
    let text = generate_with_retry(&generator, &request(), 3).await.unwrap();
    assert_eq!(text, "feat: survive a rate limit");
}
