use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{prelude::*, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait};
use uuid::Uuid;

use crate::models::internal::{Conversation, Message, NewMessage, TIMESTAMP_FORMAT};
use crate::storage::entities::{conversations, messages};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DbError(#[from] sea_orm::DbErr),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Longest session token the schema accepts.
pub const MAX_SESSION_ID_LEN: usize = 255;

// ============================================
// TRAIT DEFINITION - with Send + Sync bounds
// ============================================
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Returns the conversation for `session_id`, creating it when absent.
    async fn get_or_create(&self, session_id: &str) -> Result<Conversation, RepositoryError>;

    async fn find_by_session(&self, session_id: &str)
        -> Result<Option<Conversation>, RepositoryError>;

    async fn append_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> Result<Message, RepositoryError>;

    /// Full transcript, oldest first.
    async fn get_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Up to `limit` most recent messages, newest first, skipping `exclude`.
    async fn find_recent_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
        exclude: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError>;

    async fn count_messages_in_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<u64, RepositoryError>;
}

// ============================================
// IMPLEMENTATION STRUCT
// ============================================
pub struct SeaOrmConversationRepository {
    db: DatabaseConnection,
}

impl SeaOrmConversationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn insert_conversation(
        &self,
        session_id: &str,
    ) -> Result<conversations::Model, sea_orm::DbErr> {
        let now = format_timestamp(chrono::Utc::now().naive_utc());

        conversations::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            session_id: Set(session_id.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    async fn find_model_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<conversations::Model>, RepositoryError> {
        Ok(conversations::Entity::find()
            .filter(conversations::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await?)
    }
}

// ============================================
// TRAIT IMPLEMENTATION
// ============================================
#[async_trait]
impl ConversationRepository for SeaOrmConversationRepository {
    async fn get_or_create(&self, session_id: &str) -> Result<Conversation, RepositoryError> {
        if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
            return Err(RepositoryError::InvalidInput(format!(
                "session id must be 1..={} bytes",
                MAX_SESSION_ID_LEN
            )));
        }

        if let Some(existing) = self.find_model_by_session(session_id).await? {
            return Conversation::try_from(existing);
        }

        match self.insert_conversation(session_id).await {
            Ok(model) => {
                tracing::info!(session_id, conversation_id = %model.id, "Created conversation");
                Conversation::try_from(model)
            }
            // Another request created the same session between our read and insert
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!(session_id, "Conversation created concurrently, re-reading");
                self.find_model_by_session(session_id)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound(session_id.to_string()))
                    .and_then(Conversation::try_from)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        self.find_model_by_session(session_id)
            .await?
            .map(Conversation::try_from)
            .transpose()
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> Result<Message, RepositoryError> {
        let txn = self.db.begin().await?;

        let conversation = conversations::Entity::find_by_id(conversation_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("conversation {}", conversation_id)))?;

        let now = format_timestamp(chrono::Utc::now().naive_utc());

        let model = messages::ActiveModel {
            conversation_id: Set(conversation_id.to_string()),
            content: Set(message.content),
            kind: Set(message.kind.as_str().to_string()),
            timestamp: Set(now.clone()),
            video_url: Set(message.video_url),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut conversation: conversations::ActiveModel = conversation.into();
        conversation.updated_at = Set(now);
        conversation.update(&txn).await?;

        txn.commit().await?;

        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = model.id,
            kind = %model.kind,
            has_video = model.video_url.is_some(),
            "Stored message"
        );

        Message::try_from(model)
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, RepositoryError> {
        messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .order_by_asc(messages::Column::Timestamp)
            .order_by_asc(messages::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Message::try_from)
            .collect()
    }

    async fn find_recent_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
        exclude: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut query = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()));

        if let Some(id) = exclude {
            query = query.filter(messages::Column::Id.ne(id));
        }

        query
            .order_by_desc(messages::Column::Timestamp)
            .order_by_desc(messages::Column::Id)
            .limit(limit as u64)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Message::try_from)
            .collect()
    }

    async fn count_messages_in_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<u64, RepositoryError> {
        let count = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id.to_string()))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

// ============================================
// Conversions
// ============================================

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, RepositoryError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| RepositoryError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

fn parse_uuid(raw: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw).map_err(|e| RepositoryError::Corrupt(format!("uuid '{}': {}", raw, e)))
}

impl TryFrom<conversations::Model> for Conversation {
    type Error = RepositoryError;

    fn try_from(model: conversations::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id)?,
            session_id: model.session_id,
            created_at: parse_timestamp(&model.created_at)?,
            updated_at: parse_timestamp(&model.updated_at)?,
        })
    }
}

impl TryFrom<messages::Model> for Message {
    type Error = RepositoryError;

    fn try_from(model: messages::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            conversation_id: parse_uuid(&model.conversation_id)?,
            kind: model.kind.parse().map_err(RepositoryError::Corrupt)?,
            content: model.content,
            timestamp: parse_timestamp(&model.timestamp)?,
            video_url: model.video_url,
        })
    }
}
