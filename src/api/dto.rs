use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::internal::{Message, MessageKind};
use crate::orchestrator::VoiceExchange;

// ==================== REQUEST DTOs ====================

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ProcessVoiceRequest {
    /// Transcribed user utterance
    #[serde(default)]
    pub transcript: Option<String>,
    /// Conversation scope; a new one is issued when omitted
    #[serde(default)]
    pub session_id: Option<String>,
}

// ==================== RESPONSE DTOs ====================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessVoiceResponse {
    pub session_id: String,
    pub agent_response: String,
    pub video_url: Option<String>,
    pub video_generation_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_error: Option<String>,
    pub timestamp: String,
}

impl From<VoiceExchange> for ProcessVoiceResponse {
    fn from(exchange: VoiceExchange) -> Self {
        Self {
            session_id: exchange.session_id,
            agent_response: exchange.agent_response,
            video_url: exchange.video_url,
            video_generation_success: exchange.video_generation_success,
            video_error: exchange.video_error,
            timestamp: exchange.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditsResponse {
    /// Provider-defined credit summary, passed through untouched
    pub credits: serde_json::Value,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub kind: MessageKind,
    pub content: String,
    pub video_url: Option<String>,
    pub timestamp: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            kind: message.kind,
            content: message.content,
            video_url: message.video_url,
            timestamp: message.timestamp.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u32,
}
