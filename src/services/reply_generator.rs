//! Conversational reply building on top of a [`TextGenerator`].

use std::sync::Arc;

use crate::models::internal::Message;
use crate::services::llm_client::{GenerationConfig, LlmError, TextGenerator};

/// Sampling policy. Not adjustable per request.
pub const REPLY_SAMPLING: GenerationConfig = GenerationConfig {
    temperature: 0.7,
    top_p: 0.9,
    top_k: 40,
    max_output_tokens: 200,
};

const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant in a video chat conversation. \
Respond naturally and conversationally. Keep responses concise but engaging (1-2 sentences max).";

const NEW_CONVERSATION_MARKER: &str = "This is the start of a new conversation.";

/// Where a reply's text came from.
#[derive(Debug)]
pub enum ReplySource {
    Model,
    /// The model call failed and the canned echo was used instead.
    Fallback(LlmError),
}

#[derive(Debug)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ReplySource::Fallback(_))
    }

    pub fn fallback_reason(&self) -> Option<&LlmError> {
        match &self.source {
            ReplySource::Fallback(e) => Some(e),
            ReplySource::Model => None,
        }
    }
}

pub struct ReplyGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl ReplyGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Always yields non-empty text. `history` is newest-first, as read
    /// from the store.
    pub async fn generate_reply(&self, utterance: &str, history: &[Message]) -> Reply {
        let prompt = build_prompt(utterance, history);

        match self.generator.generate(&prompt, &REPLY_SAMPLING).await {
            Ok(text) if !text.trim().is_empty() => Reply {
                text: text.trim().to_string(),
                source: ReplySource::Model,
            },
            Ok(_) => fallback(utterance, LlmError::EmptyResponse),
            Err(e) => fallback(utterance, e),
        }
    }
}

fn fallback(utterance: &str, reason: LlmError) -> Reply {
    tracing::warn!(error = %reason, "Reply generation failed, using canned reply");
    Reply {
        text: fallback_text(utterance),
        source: ReplySource::Fallback(reason),
    }
}

/// Canned reply that echoes the utterance verbatim.
pub fn fallback_text(utterance: &str) -> String {
    format!(
        "Hello! I heard you say '{}'. I'm your AI assistant. How can I help you today?",
        utterance
    )
}

/// Renders history (newest-first) as a chronological transcript excerpt.
pub fn build_context(history: &[Message]) -> String {
    if history.is_empty() {
        return NEW_CONVERSATION_MARKER.to_string();
    }

    let mut context = String::from("Previous conversation:\n");
    for message in history.iter().rev() {
        context.push_str(message.kind.speaker());
        context.push_str(": ");
        context.push_str(&message.content);
        context.push('\n');
    }
    context
}

pub fn build_prompt(utterance: &str, history: &[Message]) -> String {
    format!(
        "{}\n\n{}\n\nUser: {}\n\nPlease respond as the Assistant:",
        SYSTEM_INSTRUCTION,
        build_context(history),
        utterance
    )
}
