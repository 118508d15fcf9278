use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{
    api::dto::*,
    config::Config,
    orchestrator::{OrchestratorError, VoiceOrchestrator, VoiceRequest},
    storage::repository::{ConversationRepository, RepositoryError},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Arc<dyn ConversationRepository + Send + Sync>,
    pub orchestrator: Arc<VoiceOrchestrator>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: status.as_u16() as u32,
        }),
    )
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[utoipa::path(
    post,
    path = "/api/process-voice",
    request_body = ProcessVoiceRequest,
    responses(
        (status = 200, description = "Agent reply, with video when rendering succeeded", body = ProcessVoiceResponse),
        (status = 400, description = "Transcript missing or blank", body = ErrorResponse),
        (status = 500, description = "Internal fault", body = ErrorResponse)
    )
)]
pub async fn process_voice(
    State(state): State<AppState>,
    payload: Result<Json<ProcessVoiceRequest>, JsonRejection>,
) -> Result<Json<ProcessVoiceResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected process-voice body");
        error_response(StatusCode::BAD_REQUEST, "No transcript provided")
    })?;

    let exchange = state
        .orchestrator
        .process_utterance(VoiceRequest {
            transcript: req.transcript,
            session_id: req.session_id,
        })
        .await
        .map_err(|e| match e {
            OrchestratorError::EmptyTranscript => {
                error_response(StatusCode::BAD_REQUEST, "No transcript provided")
            }
            OrchestratorError::Repository(RepositoryError::InvalidInput(msg)) => {
                error_response(StatusCode::BAD_REQUEST, msg)
            }
            OrchestratorError::Repository(err) => {
                tracing::error!(error = %err, "Error processing voice input");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Server error: {}", err),
                )
            }
        })?;

    Ok(Json(exchange.into()))
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: now_rfc3339(),
    })
}

#[utoipa::path(
    get,
    path = "/api/credits",
    responses(
        (status = 200, description = "Remaining video credits", body = CreditsResponse),
        (status = 500, description = "Video provider fault", body = ErrorResponse)
    )
)]
pub async fn credits(State(state): State<AppState>) -> Result<Json<CreditsResponse>, ApiError> {
    let credits = state
        .orchestrator
        .video_renderer()
        .credits()
        .await
        .map_err(|e| {
            tracing::error!(kind = e.kind(), error = %e, "Error checking video credits");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(CreditsResponse {
        credits,
        timestamp: now_rfc3339(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{session_id}",
    params(("session_id" = String, Path, description = "Session token")),
    responses(
        (status = 200, description = "Chronological transcript", body = TranscriptResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 500, description = "Internal fault", body = ErrorResponse)
    )
)]
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let internal = |e: RepositoryError| {
        tracing::error!(error = %e, "Error loading transcript");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    };

    let conversation = state
        .repo
        .find_by_session(&session_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Conversation not found"))?;

    let messages = state
        .repo
        .get_conversation_messages(conversation.id)
        .await
        .map_err(internal)?;

    Ok(Json(TranscriptResponse {
        session_id: conversation.session_id,
        created_at: conversation.created_at.and_utc().to_rfc3339(),
        updated_at: conversation.updated_at.and_utc().to_rfc3339(),
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

#[derive(OpenApi)]
#[openapi(
    paths(process_voice, health, credits, get_transcript),
    components(schemas(
        ProcessVoiceRequest,
        ProcessVoiceResponse,
        HealthResponse,
        CreditsResponse,
        TranscriptResponse,
        MessageResponse,
        ErrorResponse
    ))
)]
pub struct ApiDoc;

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_router(state: AppState) -> Router {
    let cors_enabled = state.config.cors_enabled;

    // The browser frontend posts with trailing slashes
    let router = Router::new()
        .route("/api/process-voice", post(process_voice))
        .route("/api/process-voice/", post(process_voice))
        .route("/api/health", get(health))
        .route("/api/health/", get(health))
        .route("/api/credits", get(credits))
        .route("/api/credits/", get(credits))
        .route("/api/conversations/{session_id}", get(get_transcript))
        .route("/api/conversations/{session_id}/", get(get_transcript))
        .route("/api/openapi.json", get(openapi))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
