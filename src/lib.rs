//! Talking Agent - voice conversation relay
//!
//! Takes a transcribed utterance, replies through a hosted LLM, renders the
//! reply as a talking-avatar video and keeps the transcript in SQLite.

pub mod api;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;

// Re-export main types for convenience
pub use crate::api::routes::{create_router, AppState};
pub use crate::config::Config;
pub use crate::models::internal::{Conversation, Message, MessageKind, NewMessage};
pub use crate::orchestrator::{VoiceExchange, VoiceOrchestrator, VoiceRequest};
pub use crate::services::{DidClient, GeminiClient, ReplyGenerator, VideoRenderer};
pub use crate::storage::init_db;
pub use crate::storage::repository::{ConversationRepository, SeaOrmConversationRepository};
