//! Request authentication: evidence collection, resolution, session issue.

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use domain::models::Identity;
use domain::services::{AuthEvidence, Resolution, SessionResolver};
use persistence::repositories::{IdentityStoreImpl, SessionRepository};
use shared::jwt::ProviderJwt;

use crate::app::AppState;
use crate::services::cookies::{extract_cookie, PROVIDER_ACCESS_COOKIE, SESSION_COOKIE};

/// Collects the authentication evidence present on a request.
///
/// A session cookie counts only if its signature checks out; a provider
/// cookie only if its JWT verifies. Anything else is ignored.
pub fn collect_evidence(
    headers: &HeaderMap,
    session_secret: &[u8],
    provider: Option<&ProviderJwt>,
) -> Vec<AuthEvidence> {
    let mut evidence = Vec::with_capacity(2);

    if let Some(token) = extract_cookie(headers, SESSION_COOKIE) {
        match shared::session_token::verify(token, session_secret) {
            Ok(parsed) => evidence.push(AuthEvidence::DatabaseToken {
                token: token.to_string(),
                user_id: parsed.user_id,
            }),
            Err(e) => tracing::debug!(error = %e, "Ignoring session cookie"),
        }
    }

    if let (Some(token), Some(provider)) = (extract_cookie(headers, PROVIDER_ACCESS_COOKIE), provider)
    {
        match provider.verify(token) {
            Ok(claims) => evidence.push(AuthEvidence::Provider {
                subject: claims.sub,
                email: claims.email,
            }),
            Err(e) => tracing::debug!(error = %e, "Ignoring provider cookie"),
        }
    }

    evidence
}

/// Resolves the caller of a request. Never fails: anything unusable is
/// anonymous.
pub async fn resolve_request(state: &AppState, headers: &HeaderMap) -> Resolution {
    let evidence = collect_evidence(
        headers,
        state.config.session.secret.as_bytes(),
        state.provider_jwt.as_deref(),
    );
    if evidence.is_empty() {
        return Resolution::Anonymous;
    }

    let store = IdentityStoreImpl::new(state.pool.clone());
    SessionResolver::new(&store).resolve(&evidence).await
}

/// Issues a new database session for `identity` and returns the cookie token.
pub async fn issue_session(state: &AppState, identity: &Identity) -> Result<String, sqlx::Error> {
    let now = Utc::now();
    let token = shared::session_token::generate(
        identity.id,
        now,
        state.config.session.secret.as_bytes(),
    );
    let expires_at = now + Duration::seconds(state.config.session.ttl_secs);

    let sessions = SessionRepository::new(state.pool.clone());
    sessions
        .create(identity.id, &shared::crypto::sha256_hex(&token), expires_at)
        .await?;

    match sessions.delete_expired().await {
        Ok(0) => {}
        Ok(removed) => tracing::debug!(removed, "Removed expired sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to remove expired sessions"),
    }

    Ok(token)
}

/// Revokes the database session named by the request's session cookie, if any.
pub async fn revoke_session(state: &AppState, headers: &HeaderMap) -> Result<bool, sqlx::Error> {
    let Some(token) = extract_cookie(headers, SESSION_COOKIE) else {
        return Ok(false);
    };
    SessionRepository::new(state.pool.clone())
        .delete_by_token_hash(&shared::crypto::sha256_hex(token))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_signed_session_cookie_is_evidence() {
        let token = shared::session_token::generate(42, Utc::now(), SECRET);
        let evidence = collect_evidence(&headers(&format!("db-auth-token={}", token)), SECRET, None);
        assert_eq!(
            evidence,
            vec![AuthEvidence::DatabaseToken {
                token,
                user_id: 42
            }]
        );
    }

    #[test]
    fn test_unsigned_or_forged_cookie_is_ignored() {
        let evidence = collect_evidence(&headers("db-auth-token=db-42-1700000000000"), SECRET, None);
        assert!(evidence.is_empty());

        let forged = shared::session_token::generate(42, Utc::now(), b"another-secret");
        let evidence =
            collect_evidence(&headers(&format!("db-auth-token={}", forged)), SECRET, None);
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_provider_cookie_requires_configured_verifier() {
        let provider = ProviderJwt::new("provider-secret", None, 0).unwrap();
        let jwt = provider.issue("sub-1", Some("p@example.org"), 600).unwrap();
        let request = headers(&format!("sb-access-token={}", jwt));

        assert!(collect_evidence(&request, SECRET, None).is_empty());
        assert_eq!(
            collect_evidence(&request, SECRET, Some(&provider)),
            vec![AuthEvidence::Provider {
                subject: "sub-1".into(),
                email: Some("p@example.org".into())
            }]
        );
    }

    #[test]
    fn test_both_cookies_collected() {
        let provider = ProviderJwt::new("provider-secret", None, 0).unwrap();
        let jwt = provider.issue("sub-1", None, 600).unwrap();
        let token = shared::session_token::generate(7, Utc::now(), SECRET);
        let request = headers(&format!("sb-access-token={}; db-auth-token={}", jwt, token));

        let evidence = collect_evidence(&request, SECRET, Some(&provider));
        assert_eq!(evidence.len(), 2);
    }
}
