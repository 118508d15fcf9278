use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use talking_agent::{
    api::routes,
    config::Config,
    orchestrator::VoiceOrchestrator,
    services::{DidClient, GeminiClient, ReplyGenerator, VideoRenderer},
    storage::{self, repository::SeaOrmConversationRepository},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load config
    let config = Arc::new(Config::load()?);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("talking_agent={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database
    let db_conn = storage::init_db(&config.database_url, config.max_connections).await?;
    let repository = Arc::new(SeaOrmConversationRepository::new(db_conn));

    // Upstream clients are built once and shared by every request
    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
    )?;
    let did = DidClient::new(config.did_api_key.clone(), config.did_base_url.clone())?;

    let reply_generator = Arc::new(ReplyGenerator::new(Arc::new(gemini)));
    let video_renderer = Arc::new(VideoRenderer::new(did, config.render_settings()));

    let orchestrator = Arc::new(
        VoiceOrchestrator::new(repository.clone(), reply_generator, video_renderer)
            .with_history_window(config.history_window),
    );

    // Create application state
    let state = routes::AppState {
        config: config.clone(),
        repo: repository,
        orchestrator,
    };

    let app = routes::create_router(state);

    // Start server
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!(model = %config.gemini_model, url = %config.gemini_base_url, "Reply model");
    tracing::info!(url = %config.did_base_url, backups = config.backup_avatar_urls.len(), "Video API");
    tracing::info!("Voice endpoint: POST /api/process-voice/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
