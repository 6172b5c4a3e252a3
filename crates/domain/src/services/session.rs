//! Caller identity resolution from authentication evidence.
//!
//! Two mechanisms can authenticate a request: the custom `db-auth-token`
//! cookie backed by the `sessions` table, and the managed auth provider's
//! session cookie. Both are collected as [`AuthEvidence`] and merged here by
//! a single resolver. The database token takes precedence; each mechanism
//! that fails falls through to the next, and a caller with no usable
//! evidence is anonymous.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AuthMethod, Identity};

/// Errors an identity store may report.
#[derive(Debug, Error)]
pub enum IdentityStoreError {
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored identity is invalid: {0}")]
    Invalid(String),
}

/// Lookups needed to turn evidence into an [`Identity`].
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Finds the user owning a live (unexpired) database session.
    ///
    /// `token` is the raw cookie value; implementations compare its hash.
    async fn find_by_session_token(
        &self,
        token: &str,
        user_id: i32,
    ) -> Result<Option<Identity>, IdentityStoreError>;

    /// Finds the user an auth-provider session belongs to.
    async fn find_by_provider_subject(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<Option<Identity>, IdentityStoreError>;
}

/// One piece of authentication evidence found on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvidence {
    /// A `db-auth-token` cookie whose format parsed.
    DatabaseToken { token: String, user_id: i32 },
    /// A verified auth-provider session.
    Provider {
        subject: String,
        email: Option<String>,
    },
}

impl AuthEvidence {
    fn precedence(&self) -> u8 {
        match self {
            AuthEvidence::DatabaseToken { .. } => 0,
            AuthEvidence::Provider { .. } => 1,
        }
    }

    fn method(&self) -> AuthMethod {
        match self {
            AuthEvidence::DatabaseToken { .. } => AuthMethod::DatabaseSession,
            AuthEvidence::Provider { .. } => AuthMethod::Provider,
        }
    }
}

/// Outcome of resolving a request's evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Anonymous,
    DbAuthenticated(Identity),
    ProviderAuthenticated(Identity),
}

impl Resolution {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Resolution::Anonymous => None,
            Resolution::DbAuthenticated(identity) | Resolution::ProviderAuthenticated(identity) => {
                Some(identity)
            }
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Resolution::Anonymous => None,
            Resolution::DbAuthenticated(identity) | Resolution::ProviderAuthenticated(identity) => {
                Some(identity)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Resolution::Anonymous)
    }
}

/// Resolves evidence against an [`IdentityStore`].
pub struct SessionResolver<'a, S: IdentityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: IdentityStore + ?Sized> SessionResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolves the caller, trying evidence in precedence order.
    ///
    /// Store errors are logged and treated as a miss.
    pub async fn resolve(&self, evidence: &[AuthEvidence]) -> Resolution {
        let mut ordered: Vec<&AuthEvidence> = evidence.iter().collect();
        ordered.sort_by_key(|e| e.precedence());

        for item in ordered {
            let lookup = match item {
                AuthEvidence::DatabaseToken { token, user_id } => {
                    self.store.find_by_session_token(token, *user_id).await
                }
                AuthEvidence::Provider { subject, email } => {
                    self.store
                        .find_by_provider_subject(subject, email.as_deref())
                        .await
                }
            };

            match lookup {
                Ok(Some(mut identity)) => {
                    identity.auth_method = item.method();
                    tracing::debug!(user_id = identity.id, method = ?identity.auth_method, "Resolved caller");
                    return match item {
                        AuthEvidence::DatabaseToken { .. } => Resolution::DbAuthenticated(identity),
                        AuthEvidence::Provider { .. } => Resolution::ProviderAuthenticated(identity),
                    };
                }
                Ok(None) => {
                    tracing::debug!(method = ?item.method(), "Evidence did not match an account");
                }
                Err(e) => {
                    tracing::warn!(method = ?item.method(), error = %e, "Identity lookup failed");
                }
            }
        }

        Resolution::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        sessions: HashMap<String, Identity>,
        provider: HashMap<String, Identity>,
        failing_sessions: bool,
    }

    #[async_trait]
    impl IdentityStore for MemoryStore {
        async fn find_by_session_token(
            &self,
            token: &str,
            user_id: i32,
        ) -> Result<Option<Identity>, IdentityStoreError> {
            if self.failing_sessions {
                return Err(IdentityStoreError::Unavailable("connection refused".into()));
            }
            Ok(self
                .sessions
                .get(token)
                .filter(|identity| identity.id == user_id)
                .cloned())
        }

        async fn find_by_provider_subject(
            &self,
            subject: &str,
            _email: Option<&str>,
        ) -> Result<Option<Identity>, IdentityStoreError> {
            Ok(self.provider.get(subject).cloned())
        }
    }

    fn identity(id: i32, role: Role) -> Identity {
        Identity {
            id,
            email: format!("user{}@example.org", id),
            username: format!("user{}", id),
            role,
            diocese_id: Some(5),
            testing_center_id: None,
            auth_method: AuthMethod::Provider,
        }
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::default();
        store
            .sessions
            .insert("db-1-1700000000000".into(), identity(1, Role::DioceseManager));
        store
            .provider
            .insert("provider-user-2".into(), identity(2, Role::SuperAdmin));
        store
    }

    fn db_evidence() -> AuthEvidence {
        AuthEvidence::DatabaseToken {
            token: "db-1-1700000000000".into(),
            user_id: 1,
        }
    }

    fn provider_evidence() -> AuthEvidence {
        AuthEvidence::Provider {
            subject: "provider-user-2".into(),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_no_evidence_is_anonymous() {
        let store = store();
        let resolution = SessionResolver::new(&store).resolve(&[]).await;
        assert_eq!(resolution, Resolution::Anonymous);
        assert!(resolution.identity().is_none());
    }

    #[tokio::test]
    async fn test_database_token_takes_precedence() {
        let store = store();
        let resolution = SessionResolver::new(&store)
            .resolve(&[provider_evidence(), db_evidence()])
            .await;
        match resolution {
            Resolution::DbAuthenticated(identity) => {
                assert_eq!(identity.id, 1);
                assert_eq!(identity.auth_method, AuthMethod::DatabaseSession);
            }
            other => panic!("expected database session, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_provider_on_miss() {
        let store = store();
        let stale = AuthEvidence::DatabaseToken {
            token: "db-9-1700000000000".into(),
            user_id: 9,
        };
        let resolution = SessionResolver::new(&store)
            .resolve(&[stale, provider_evidence()])
            .await;
        assert!(matches!(resolution, Resolution::ProviderAuthenticated(ref i) if i.id == 2));
    }

    #[tokio::test]
    async fn test_store_error_falls_through() {
        let mut store = store();
        store.failing_sessions = true;
        let resolver = SessionResolver::new(&store);

        let resolution = resolver.resolve(&[db_evidence(), provider_evidence()]).await;
        assert!(matches!(resolution, Resolution::ProviderAuthenticated(_)));

        let resolution = resolver.resolve(&[db_evidence()]).await;
        assert_eq!(resolution, Resolution::Anonymous);
    }

    #[tokio::test]
    async fn test_token_for_other_user_is_rejected() {
        let store = store();
        let forged = AuthEvidence::DatabaseToken {
            token: "db-1-1700000000000".into(),
            user_id: 2,
        };
        let resolution = SessionResolver::new(&store).resolve(&[forged]).await;
        assert!(!resolution.is_authenticated());
    }
}
