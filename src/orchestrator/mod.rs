//! Per-utterance request flow: persist, reply, render, persist, respond.

pub mod exchange;

pub use exchange::{OrchestratorError, VoiceExchange, VoiceRequest};

use std::sync::Arc;
use uuid::Uuid;

use crate::models::internal::NewMessage;
use crate::services::reply_generator::ReplyGenerator;
use crate::services::video_renderer::VideoRenderer;
use crate::storage::repository::ConversationRepository;

/// How many prior messages feed the reply prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

pub struct VoiceOrchestrator {
    repo: Arc<dyn ConversationRepository + Send + Sync>,
    reply_generator: Arc<ReplyGenerator>,
    video_renderer: Arc<VideoRenderer>,
    history_window: usize,
}

impl VoiceOrchestrator {
    pub fn new(
        repo: Arc<dyn ConversationRepository + Send + Sync>,
        reply_generator: Arc<ReplyGenerator>,
        video_renderer: Arc<VideoRenderer>,
    ) -> Self {
        Self {
            repo,
            reply_generator,
            video_renderer,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    pub fn video_renderer(&self) -> &VideoRenderer {
        &self.video_renderer
    }

    /// Runs one utterance through the pipeline. Upstream service failures
    /// degrade the result; only bad input and storage faults are errors.
    pub async fn process_utterance(
        &self,
        request: VoiceRequest,
    ) -> Result<VoiceExchange, OrchestratorError> {
        let transcript = request
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(OrchestratorError::EmptyTranscript)?
            .to_string();

        let session_id = request
            .session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let conversation = self.repo.get_or_create(&session_id).await?;

        let user_message = self
            .repo
            .append_message(conversation.id, NewMessage::user(transcript.clone()))
            .await?;

        let history = self
            .repo
            .find_recent_messages(conversation.id, self.history_window, Some(user_message.id))
            .await?;

        tracing::info!(
            session_id = %session_id,
            history = history.len(),
            "Processing utterance"
        );

        let reply = self
            .reply_generator
            .generate_reply(&transcript, &history)
            .await;
        if let Some(reason) = reply.fallback_reason() {
            tracing::warn!(session_id = %session_id, error = %reason, "Serving fallback reply");
        }

        let render = self.video_renderer.render(&reply.text, None).await;
        let video_url = render.video_url().map(str::to_string);
        let video_error = render.error();

        if let Some(err) = &video_error {
            tracing::warn!(
                session_id = %session_id,
                attempts = render.attempts,
                error = %err,
                "Video generation failed, replying with text only"
            );
        }

        self.repo
            .append_message(
                conversation.id,
                NewMessage::agent(reply.text.clone(), video_url.clone()),
            )
            .await?;

        let reply_fallback = reply.is_fallback();

        Ok(VoiceExchange {
            session_id,
            agent_response: reply.text,
            video_generation_success: video_url.is_some(),
            video_url,
            video_error,
            reply_fallback,
            timestamp: chrono::Utc::now(),
        })
    }
}
