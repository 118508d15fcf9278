//! Hosted talking-avatar video API (D-ID "talks").

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_DID_BASE_URL: &str = "https://api.d-id.com";

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(20);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),
    #[error("Video API rejected submission: {status} - {body}")]
    Rejected { status: u16, body: String },
    #[error("Video API accepted submission but returned no job id")]
    MissingJobId,
    #[error("Status check for job {job_id} failed: {status}")]
    StatusCheckFailed { job_id: String, status: u16 },
    #[error("Video generation failed for job {job_id}: {detail}")]
    Failed { job_id: String, detail: String },
    #[error("Video generation timed out after {}s (job {job_id})", .waited.as_secs())]
    Timeout { job_id: String, waited: Duration },
    #[error("Job {job_id} finished without a result url")]
    MissingResultUrl { job_id: String },
    #[error("Video API transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("No avatar sources configured")]
    NoAvatars,
}

impl VideoError {
    /// Short machine-readable tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            VideoError::MissingApiKey(_) => "missing_api_key",
            VideoError::Rejected { .. } => "submission_rejected",
            VideoError::MissingJobId => "missing_job_id",
            VideoError::StatusCheckFailed { .. } => "status_check_failed",
            VideoError::Failed { .. } => "error_status",
            VideoError::Timeout { .. } => "timeout",
            VideoError::MissingResultUrl { .. } => "missing_result_url",
            VideoError::Transport(_) => "transport",
            VideoError::InvalidResponse(_) => "invalid_response",
            VideoError::NoAvatars => "no_avatars",
        }
    }

    /// Whether a different avatar could plausibly succeed. Credential and
    /// quota rejections apply to every avatar alike.
    pub fn is_retryable(&self) -> bool {
        match self {
            VideoError::MissingApiKey(_) | VideoError::NoAvatars => false,
            VideoError::Rejected { status, .. } => !matches!(status, 401 | 402 | 403),
            _ => true,
        }
    }
}

/// Lifecycle state reported for a talk job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TalkStatus {
    Created,
    Started,
    Done,
    Error,
    Rejected,
    Other(String),
}

impl From<&str> for TalkStatus {
    fn from(s: &str) -> Self {
        match s {
            "created" => TalkStatus::Created,
            "started" => TalkStatus::Started,
            "done" => TalkStatus::Done,
            "error" => TalkStatus::Error,
            "rejected" => TalkStatus::Rejected,
            other => TalkStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Talk {
    pub status: TalkStatus,
    pub result_url: Option<String>,
    pub error: Option<Value>,
}

#[derive(Clone)]
pub struct DidClient {
    client: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl DidClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, VideoError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(VideoError::MissingApiKey("D-ID"))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            // The key is issued already encoded for Basic auth
            authorization: format!("Basic {}", api_key),
        })
    }

    /// Submits a render job and returns its id.
    pub async fn create_talk(&self, source_url: &str, script: &str) -> Result<String, VideoError> {
        let request = CreateTalkRequest {
            source_url,
            script: Script {
                kind: "text",
                input: script,
            },
        };

        let response = self
            .client
            .post(format!("{}/talks", self.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(SUBMIT_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VideoError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let created: CreateTalkResponse = response
            .json()
            .await
            .map_err(|e| VideoError::InvalidResponse(e.to_string()))?;

        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or(VideoError::MissingJobId)
    }

    pub async fn get_talk(&self, talk_id: &str) -> Result<Talk, VideoError> {
        let response = self
            .client
            .get(format!("{}/talks/{}", self.base_url, talk_id))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VideoError::StatusCheckFailed {
                job_id: talk_id.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: TalkResponse = response
            .json()
            .await
            .map_err(|e| VideoError::InvalidResponse(e.to_string()))?;

        Ok(Talk {
            status: TalkStatus::from(body.status.as_deref().unwrap_or("")),
            result_url: body.result_url,
            error: body.error,
        })
    }

    /// Remaining account credits, passed through as returned by the provider.
    pub async fn get_credits(&self) -> Result<Value, VideoError> {
        let response = self
            .client
            .get(format!("{}/credits", self.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VideoError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| VideoError::InvalidResponse(e.to_string()))
    }
}

// Request/Response Models
#[derive(Serialize)]
struct CreateTalkRequest<'a> {
    source_url: &'a str,
    script: Script<'a>,
}

#[derive(Serialize)]
struct Script<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    input: &'a str,
}

#[derive(Deserialize)]
struct CreateTalkResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct TalkResponse {
    status: Option<String>,
    result_url: Option<String>,
    error: Option<Value>,
}
