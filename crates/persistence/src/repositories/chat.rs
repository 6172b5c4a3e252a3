//! Chat repository for database operations.
//!
//! Every query is keyed by both chat id and owner id, so a chat is never
//! visible to anyone but its owner.

use chrono::{DateTime, Utc};
use domain::models::{Chat, ChatMessage, ChatSummary};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ChatEntity, ChatSummaryEntity};
use crate::metrics::QueryTimer;

/// Outcome of a conditional chat update.
#[derive(Debug)]
pub enum ChatUpdate {
    Updated(Chat),
    /// The stored `updated_at` differs from the caller's.
    Conflict { current_updated_at: DateTime<Utc> },
    NotFound,
}

/// Repository for saved chats.
#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<ChatSummary>, sqlx::Error> {
        let timer = QueryTimer::new("list_chats_for_user");
        let result = sqlx::query_as::<_, ChatSummaryEntity>(
            r#"
            SELECT id, title, jsonb_array_length(messages)::bigint AS message_count, updated_at
            FROM chats
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        Ok(timer.finish(result)?.into_iter().map(Into::into).collect())
    }

    pub async fn find(&self, id: Uuid, user_id: i32) -> Result<Option<Chat>, sqlx::Error> {
        let timer = QueryTimer::new("find_chat");
        let result = sqlx::query_as::<_, ChatEntity>(
            r#"
            SELECT id, user_id, title, messages, created_at, updated_at
            FROM chats
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(Into::into))
    }

    pub async fn create(
        &self,
        user_id: i32,
        title: &str,
        messages: &[ChatMessage],
    ) -> Result<Chat, sqlx::Error> {
        let timer = QueryTimer::new("create_chat");
        let result = sqlx::query_as::<_, ChatEntity>(
            r#"
            INSERT INTO chats (user_id, title, messages)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, messages, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(title.trim())
        .bind(Json(messages))
        .fetch_one(&self.pool)
        .await;
        Ok(timer.finish(result)?.into())
    }

    /// Replace a chat's messages (and optionally its title) if it has not
    /// changed since `expected_updated_at`.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: i32,
        title: Option<&str>,
        messages: &[ChatMessage],
        expected_updated_at: DateTime<Utc>,
    ) -> Result<ChatUpdate, sqlx::Error> {
        let timer = QueryTimer::new("update_chat");
        let result = sqlx::query_as::<_, ChatEntity>(
            r#"
            UPDATE chats
            SET title = COALESCE($3, title), messages = $4, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND updated_at = $5
            RETURNING id, user_id, title, messages, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title.map(str::trim))
        .bind(Json(messages))
        .bind(expected_updated_at)
        .fetch_optional(&self.pool)
        .await;

        if let Some(entity) = timer.finish(result)? {
            return Ok(ChatUpdate::Updated(entity.into()));
        }

        Ok(match self.find(id, user_id).await? {
            Some(current) => ChatUpdate::Conflict {
                current_updated_at: current.updated_at,
            },
            None => ChatUpdate::NotFound,
        })
    }

    /// Append messages unconditionally. Returns `None` if the chat is not
    /// the caller's.
    pub async fn append_messages(
        &self,
        id: Uuid,
        user_id: i32,
        messages: &[ChatMessage],
    ) -> Result<Option<Chat>, sqlx::Error> {
        let timer = QueryTimer::new("append_chat_messages");
        let result = sqlx::query_as::<_, ChatEntity>(
            r#"
            UPDATE chats
            SET messages = messages || $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, messages, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(Json(messages))
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(Into::into))
    }

    /// Hard-delete a chat. Returns `false` if it is not the caller's.
    pub async fn delete(&self, id: Uuid, user_id: i32) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_chat");
        let result = sqlx::query("DELETE FROM chats WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await;
        Ok(timer.finish(result)?.rows_affected() > 0)
    }
}
