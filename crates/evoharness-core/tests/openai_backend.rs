//! OpenAI-compatible backend against a mock HTTP server.

use std::time::Duration;

use evoharness_core::{
    BackendError, ChatMessage, ModelBackend, ModelConfig, OpenAiCompatibleBackend,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model(server: &MockServer) -> ModelConfig {
    ModelConfig::new("test-model", format!("{}/v1", server.uri()), 1.0)
}

fn messages() -> Vec<ChatMessage> {
    vec![ChatMessage::system("system"), ChatMessage::user("improve this")]
}

#[tokio::test]
async fn test_returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({"model": "test-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "```rhai\nfn sort(a) { a }\n```"}},
                {"message": {"role": "assistant", "content": "second"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiCompatibleBackend::new(Duration::from_secs(5))
        .unwrap()
        .with_token("test-model", "secret");
    let text = backend.complete(&model(&server), &messages()).await.unwrap();
    assert!(text.contains("fn sort(a)"));
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let backend = OpenAiCompatibleBackend::new(Duration::from_secs(5)).unwrap();
    let err = backend.complete(&model(&server), &messages()).await.unwrap_err();
    assert_eq!(err, BackendError::Auth("invalid api key".into()));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_rate_limit_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let backend = OpenAiCompatibleBackend::new(Duration::from_secs(5)).unwrap();
    let err = backend.complete(&model(&server), &messages()).await.unwrap_err();
    assert!(matches!(err, BackendError::RateLimited(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let backend = OpenAiCompatibleBackend::new(Duration::from_secs(5)).unwrap();
    let err = backend.complete(&model(&server), &messages()).await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Http {
            status: 503,
            body: "overloaded".into()
        }
    );
}

#[tokio::test]
async fn test_empty_choices_is_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let backend = OpenAiCompatibleBackend::new(Duration::from_secs(5)).unwrap();
    let err = backend.complete(&model(&server), &messages()).await.unwrap_err();
    assert_eq!(err, BackendError::EmptyCompletion);
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let backend = OpenAiCompatibleBackend::new(Duration::from_secs(5)).unwrap();
    let err = backend.complete(&model(&server), &messages()).await.unwrap_err();
    assert!(matches!(err, BackendError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let backend = OpenAiCompatibleBackend::new(Duration::from_millis(50)).unwrap();
    let err = backend.complete(&model(&server), &messages()).await.unwrap_err();
    assert_eq!(err, BackendError::Timeout(50));
}

#[tokio::test]
async fn test_token_read_from_environment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    std::env::set_var("EVOHARNESS_TEST_BACKEND_KEY", "from-env");
    let model = model(&server).with_api_key_env("EVOHARNESS_TEST_BACKEND_KEY");
    let backend =
        OpenAiCompatibleBackend::from_env(std::slice::from_ref(&model), Duration::from_secs(5))
            .unwrap();
    assert_eq!(backend.complete(&model, &messages()).await.unwrap(), "ok");
}
