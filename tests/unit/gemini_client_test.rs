use serde_json::json;
use talking_agent::services::llm_client::{GeminiClient, LlmError, TextGenerator};
use talking_agent::services::reply_generator::REPLY_SAMPLING;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new(Some("secret".to_string()), server.uri(), MODEL).unwrap()
}

fn candidate(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
}

#[test]
fn test_gemini_client_requires_key() {
    assert!(matches!(
        GeminiClient::new(None, "http://localhost:1", MODEL),
        Err(LlmError::MissingApiKey(_))
    ));
    assert!(matches!(
        GeminiClient::new(Some("  ".to_string()), "http://localhost:1", MODEL),
        Err(LlmError::MissingApiKey(_))
    ));
}

#[tokio::test]
async fn test_generate_sends_prompt_and_sampling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", MODEL)))
        .and(header("x-goog-api-key", "secret"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "Say hi" }] }],
            "generationConfig": { "topK": 40, "maxOutputTokens": 200 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("  Hi!  ")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server)
        .generate("Say hi", &REPLY_SAMPLING)
        .await
        .unwrap();

    assert_eq!(text, "Hi!");
}

#[tokio::test]
async fn test_generate_trailing_slash_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", MODEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("ok")))
        .mount(&server)
        .await;

    let client =
        GeminiClient::new(Some("secret".to_string()), format!("{}/", server.uri()), MODEL).unwrap();
    assert_eq!(client.generate("x", &REPLY_SAMPLING).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_generate_joins_multiple_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello, " }, { "text": "world." }] }
            }]
        })))
        .mount(&server)
        .await;

    let text = client_for(&server)
        .generate("x", &REPLY_SAMPLING)
        .await
        .unwrap();
    assert_eq!(text, "Hello, world.");
}

#[tokio::test]
async fn test_generate_api_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate("x", &REPLY_SAMPLING)
        .await
        .unwrap_err();

    match err {
        LlmError::ApiError { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_without_candidates_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate("x", &REPLY_SAMPLING)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

#[tokio::test]
async fn test_generate_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate("x", &REPLY_SAMPLING)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::InvalidResponse(_)));
}
