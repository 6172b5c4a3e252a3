//! Session entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the sessions table.
///
/// Only the SHA-256 hash of the `db-auth-token` cookie is stored.
#[derive(Debug, Clone, FromRow)]
pub struct SessionEntity {
    pub id: Uuid,
    pub user_id: i32,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntity {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
