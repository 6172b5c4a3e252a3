//! PostgreSQL-backed [`IdentityStore`].

use async_trait::async_trait;
use domain::models::{AuthMethod, Identity};
use domain::services::{IdentityStore, IdentityStoreError};
use sqlx::PgPool;

use super::{SessionRepository, UserRepository};
use crate::entities::UserEntity;

/// Resolves identities from the `sessions` and `users` tables.
#[derive(Clone)]
pub struct IdentityStoreImpl {
    sessions: SessionRepository,
    users: UserRepository,
}

impl IdentityStoreImpl {
    pub fn new(pool: PgPool) -> Self {
        Self {
            sessions: SessionRepository::new(pool.clone()),
            users: UserRepository::new(pool),
        }
    }
}

fn to_identity(
    entity: Option<UserEntity>,
    method: AuthMethod,
) -> Result<Option<Identity>, IdentityStoreError> {
    entity
        .map(|e| e.into_identity(method))
        .transpose()
        .map_err(IdentityStoreError::Invalid)
}

#[async_trait]
impl IdentityStore for IdentityStoreImpl {
    async fn find_by_session_token(
        &self,
        token: &str,
        user_id: i32,
    ) -> Result<Option<Identity>, IdentityStoreError> {
        let token_hash = shared::crypto::sha256_hex(token);
        let entity = self
            .sessions
            .find_live_user(&token_hash, user_id)
            .await
            .map_err(|e| IdentityStoreError::Unavailable(e.to_string()))?;
        to_identity(entity, AuthMethod::DatabaseSession)
    }

    async fn find_by_provider_subject(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<Option<Identity>, IdentityStoreError> {
        let entity = self
            .users
            .find_by_provider_subject(subject, email)
            .await
            .map_err(|e| IdentityStoreError::Unavailable(e.to_string()))?;
        to_identity(entity, AuthMethod::Provider)
    }
}
