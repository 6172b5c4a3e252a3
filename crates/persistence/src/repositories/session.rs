//! Session repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::entities::{SessionEntity, UserEntity};
use crate::metrics::QueryTimer;

/// Repository for `db-auth-token` sessions.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a new session.
    pub async fn create(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_session");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.finish(result)
    }

    /// The owner of a live session, if the hash matches an unexpired row
    /// belonging to `user_id`.
    pub async fn find_live_user(
        &self,
        token_hash: &str,
        user_id: i32,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_live_session_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT u.id, u.email, u.username, u.password_hash, u.provider_subject, u.role,
                   u.diocese_id, u.testing_center_id, u.created_at, u.updated_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.user_id = $2 AND s.expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Delete a session by token hash. Returns whether a row was removed.
    pub async fn delete_by_token_hash(&self, token_hash: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_session_by_token");
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await;
        Ok(timer.finish(result)?.rows_affected() > 0)
    }

    /// Remove sessions past their expiry. Returns the number removed.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_expired_sessions");
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await;
        Ok(timer.finish(result)?.rows_affected())
    }
}
