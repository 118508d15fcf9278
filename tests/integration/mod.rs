// tests/integration/mod.rs

// ============================================
// Re-export commonly used types
// ============================================
pub use serde_json::json;
pub use std::sync::Arc;

use axum::Router;
use talking_agent::{
    api::routes::{create_router, AppState},
    config::Config,
    orchestrator::VoiceOrchestrator,
    services::{DidClient, GeminiClient, ReplyGenerator, VideoRenderer},
    storage::{init_db, SeaOrmConversationRepository},
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub mod concurrency;

// ============================================
// Shared Test Helpers
// ============================================

pub const TEST_MODEL: &str = "gemini-2.0-flash";
pub const PRIMARY_AVATAR: &str = "https://avatars.test/primary.jpg";
pub const BACKUP_AVATARS: [&str; 2] = [
    "https://avatars.test/backup-1.jpg",
    "https://avatars.test/backup-2.jpg",
];

/// Config pointing both upstream services at the given base URLs, with
/// polling fast enough for tests.
pub fn create_test_config(gemini_url: &str, did_url: &str) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        gemini_api_key: Some("test-gemini-key".to_string()),
        gemini_base_url: gemini_url.to_string(),
        gemini_model: TEST_MODEL.to_string(),
        did_api_key: Some("dGVzdDp0ZXN0".to_string()),
        did_base_url: did_url.to_string(),
        default_avatar_url: PRIMARY_AVATAR.to_string(),
        backup_avatar_urls: BACKUP_AVATARS.iter().map(|s| s.to_string()).collect(),
        video_poll_interval_ms: 10,
        video_timeout_secs: 2,
        ..Config::default()
    }
}

/// URL of a local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn create_test_renderer(config: &Config) -> VideoRenderer {
    let client = DidClient::new(config.did_api_key.clone(), config.did_base_url.clone()).unwrap();
    VideoRenderer::new(client, config.render_settings())
}

pub async fn create_test_state(config: Config) -> AppState {
    let db = init_db(&config.database_url, 1).await.unwrap();
    let repo = Arc::new(SeaOrmConversationRepository::new(db));

    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
    )
    .unwrap();
    let reply_generator = Arc::new(ReplyGenerator::new(Arc::new(gemini)));
    let video_renderer = Arc::new(create_test_renderer(&config));

    let orchestrator = Arc::new(
        VoiceOrchestrator::new(repo.clone(), reply_generator, video_renderer)
            .with_history_window(config.history_window),
    );

    AppState {
        config: Arc::new(config),
        repo,
        orchestrator,
    }
}

pub async fn create_test_app(config: Config) -> Router {
    create_router(create_test_state(config).await)
}

// ============================================
// Upstream mocks
// ============================================

pub fn gemini_path() -> String {
    format!("/models/{}:generateContent", TEST_MODEL)
}

pub async fn mount_gemini_reply(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path(gemini_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })))
        .mount(server)
        .await;
}

/// Prompts received by the Gemini mock, in request order.
pub async fn received_prompts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == gemini_path())
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["contents"][0]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect()
}

pub async fn mount_talk_created(server: &MockServer, avatar: &str, talk_id: &str) {
    Mock::given(method("POST"))
        .and(path("/talks"))
        .and(body_partial_json(json!({ "source_url": avatar })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": talk_id, "status": "created" })),
        )
        .mount(server)
        .await;
}

pub async fn mount_talk_rejected(server: &MockServer, avatar: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path("/talks"))
        .and(body_partial_json(json!({ "source_url": avatar })))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(json!({ "kind": "ValidationError", "description": "bad image" })),
        )
        .mount(server)
        .await;
}

pub async fn mount_talk_status(
    server: &MockServer,
    talk_id: &str,
    status: &str,
    result_url: Option<&str>,
) {
    let mut body = json!({ "id": talk_id, "status": status });
    if let Some(url) = result_url {
        body["result_url"] = json!(url);
    }

    Mock::given(method("GET"))
        .and(path(format!("/talks/{}", talk_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Submission for `avatar` succeeds and the job completes immediately.
pub async fn mount_successful_render(
    server: &MockServer,
    avatar: &str,
    talk_id: &str,
    result_url: &str,
) {
    mount_talk_created(server, avatar, talk_id).await;
    mount_talk_status(server, talk_id, "done", Some(result_url)).await;
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
