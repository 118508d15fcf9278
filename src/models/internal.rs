use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Storage format for every timestamp column. Fixed width so that text
/// ordering in SQLite matches chronological ordering.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub session_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Agent,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Agent => "agent",
        }
    }

    /// Speaker label used when a message is rendered into a prompt.
    pub fn speaker(&self) -> &'static str {
        match self {
            MessageKind::User => "User",
            MessageKind::Agent => "Assistant",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageKind::User),
            "agent" => Ok(MessageKind::Agent),
            other => Err(format!("unknown message kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: NaiveDateTime,
    /// Only set on agent messages whose video render succeeded.
    pub video_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub kind: MessageKind,
    pub content: String,
    pub video_url: Option<String>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::User,
            content: content.into(),
            video_url: None,
        }
    }

    pub fn agent(content: impl Into<String>, video_url: Option<String>) -> Self {
        Self {
            kind: MessageKind::Agent,
            content: content.into(),
            video_url,
        }
    }
}
