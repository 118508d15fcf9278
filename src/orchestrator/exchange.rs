use chrono::{DateTime, Utc};

use crate::storage::repository::RepositoryError;

#[derive(Debug, Clone, Default)]
pub struct VoiceRequest {
    pub transcript: Option<String>,
    pub session_id: Option<String>,
}

impl VoiceRequest {
    pub fn new(transcript: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            transcript: Some(transcript.into()),
            session_id,
        }
    }
}

/// Combined outcome of one utterance.
#[derive(Debug, Clone)]
pub struct VoiceExchange {
    pub session_id: String,
    pub agent_response: String,
    pub video_url: Option<String>,
    pub video_generation_success: bool,
    pub video_error: Option<String>,
    /// The reply is the canned echo rather than model output.
    pub reply_fallback: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("No transcript provided")]
    EmptyTranscript,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
