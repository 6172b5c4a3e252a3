//! Chat entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{Chat, ChatMessage, ChatSummary};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the chats table.
#[derive(Debug, Clone, FromRow)]
pub struct ChatEntity {
    pub id: Uuid,
    pub user_id: i32,
    pub title: String,
    pub messages: Json<Vec<ChatMessage>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatEntity> for Chat {
    fn from(entity: ChatEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            title: entity.title,
            messages: entity.messages.0,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Chat listing row.
#[derive(Debug, Clone, FromRow)]
pub struct ChatSummaryEntity {
    pub id: Uuid,
    pub title: String,
    pub message_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatSummaryEntity> for ChatSummary {
    fn from(entity: ChatSummaryEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            message_count: entity.message_count,
            updated_at: entity.updated_at,
        }
    }
}
