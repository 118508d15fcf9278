//! Talking-avatar rendering with avatar fallback and job polling.

use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::services::did_client::{DidClient, TalkStatus, VideoError};
use crate::services::retry::first_success;

pub const DEFAULT_AVATAR_URL: &str = "https://raw.githubusercontent.com/Asit0011/DID/main/avatar.jpg";

pub fn default_backup_avatars() -> Vec<String> {
    [
        "https://thispersondoesnotexist.com/image.jpeg",
        "https://randomuser.me/api/portraits/men/1.jpg",
        "https://randomuser.me/api/portraits/women/1.jpg",
        "https://randomuser.me/api/portraits/men/2.jpg",
        "https://randomuser.me/api/portraits/women/2.jpg",
        "https://randomuser.me/api/portraits/men/3.jpg",
        "https://randomuser.me/api/portraits/women/3.jpg",
        "https://images.pexels.com/photos/220453/pexels-photo-220453.jpeg?auto=compress&cs=tinysrgb&w=400",
        "https://images.pexels.com/photos/614810/pexels-photo-614810.jpeg?auto=compress&cs=tinysrgb&w=400",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub default_avatar: String,
    /// Tried in order after the primary avatar fails.
    pub backup_avatars: Vec<String>,
    pub script_max_chars: usize,
    pub poll_interval: Duration,
    /// Wall-clock ceiling for polling a single job.
    pub timeout: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            default_avatar: DEFAULT_AVATAR_URL.to_string(),
            backup_avatars: default_backup_avatars(),
            script_max_chars: 150,
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedVideo {
    pub video_url: String,
    pub job_id: String,
    pub avatar_url: String,
}

/// What the renderer hands back to the orchestrator. Never an `Err` at the
/// call site: failures live inside `result`.
#[derive(Debug)]
pub struct RenderOutcome {
    pub result: Result<RenderedVideo, VideoError>,
    pub attempts: usize,
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn video_url(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|v| v.video_url.as_str())
    }

    pub fn error(&self) -> Option<String> {
        self.result.as_ref().err().map(|e| e.to_string())
    }
}

pub struct VideoRenderer {
    client: DidClient,
    settings: RenderSettings,
}

impl VideoRenderer {
    pub fn new(client: DidClient, settings: RenderSettings) -> Self {
        Self { client, settings }
    }

    /// Renders `text` against `primary_avatar` (or the default avatar),
    /// walking the backup list until one attempt succeeds.
    pub async fn render(&self, text: &str, primary_avatar: Option<&str>) -> RenderOutcome {
        let script = truncate_script(text, self.settings.script_max_chars);
        let candidates = self.candidates(primary_avatar);

        let outcome = first_success(
            &candidates,
            |index, avatar| self.attempt_logged(index, &script, avatar),
            |result| match result {
                Ok(_) => true,
                Err(e) => !e.is_retryable(),
            },
        )
        .await;

        match outcome {
            Some(attempted) => {
                if let Err(e) = &attempted.result {
                    tracing::error!(
                        attempts = attempted.attempts(),
                        kind = e.kind(),
                        error = %e,
                        "All avatar attempts failed"
                    );
                }
                RenderOutcome {
                    attempts: attempted.attempts(),
                    result: attempted.result,
                }
            }
            None => RenderOutcome {
                result: Err(VideoError::NoAvatars),
                attempts: 0,
            },
        }
    }

    pub async fn credits(&self) -> Result<Value, VideoError> {
        self.client.get_credits().await
    }

    fn candidates(&self, primary_avatar: Option<&str>) -> Vec<String> {
        let primary = primary_avatar
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(self.settings.default_avatar.as_str());

        std::iter::once(primary.to_string())
            .chain(self.settings.backup_avatars.iter().cloned())
            .filter(|a| !a.trim().is_empty())
            .collect()
    }

    async fn attempt_logged(
        &self,
        index: usize,
        script: &str,
        avatar: &str,
    ) -> Result<RenderedVideo, VideoError> {
        if index == 0 {
            tracing::info!(avatar, chars = script.chars().count(), "Attempting video creation");
        } else {
            tracing::info!(avatar, backup = index, "Trying backup avatar");
        }

        let result = self.attempt(script, avatar).await;
        match &result {
            Ok(video) => {
                tracing::info!(job_id = %video.job_id, avatar, "Video render completed")
            }
            Err(e) => tracing::warn!(avatar, kind = e.kind(), error = %e, "Avatar attempt failed"),
        }
        result
    }

    /// One avatar: submit, then poll to a terminal state.
    pub async fn attempt(&self, script: &str, avatar: &str) -> Result<RenderedVideo, VideoError> {
        let job_id = self.client.create_talk(avatar, script).await?;
        tracing::debug!(%job_id, "Talk created");

        let video_url = self.wait_for_completion(&job_id).await?;

        Ok(RenderedVideo {
            video_url,
            job_id,
            avatar_url: avatar.to_string(),
        })
    }

    /// Polls the job until `done` or `error`, or until the configured
    /// ceiling has elapsed.
    pub async fn wait_for_completion(&self, job_id: &str) -> Result<String, VideoError> {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            if started.elapsed() >= self.settings.timeout {
                return Err(VideoError::Timeout {
                    job_id: job_id.to_string(),
                    waited: started.elapsed(),
                });
            }

            polls += 1;
            let talk = self.client.get_talk(job_id).await?;

            match talk.status {
                TalkStatus::Done => {
                    return talk.result_url.ok_or_else(|| VideoError::MissingResultUrl {
                        job_id: job_id.to_string(),
                    });
                }
                TalkStatus::Error | TalkStatus::Rejected => {
                    let detail = talk
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| format!("status {:?}", talk.status));
                    return Err(VideoError::Failed {
                        job_id: job_id.to_string(),
                        detail,
                    });
                }
                TalkStatus::Created | TalkStatus::Started => {
                    tracing::debug!(job_id, polls, "Video still processing");
                }
                TalkStatus::Other(ref status) => {
                    tracing::warn!(job_id, polls, status = %status, "Unknown talk status");
                }
            }

            sleep(self.settings.poll_interval).await;
        }
    }
}

/// Cuts `text` to at most `max_chars` characters.
pub fn truncate_script(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
