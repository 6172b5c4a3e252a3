//! Managed-auth provider session tokens.
//!
//! The hosted auth provider issues HS256-signed JWTs with a project-wide
//! secret. This module verifies them and exposes the claims the backend
//! relies on (subject and email).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Claims carried by a provider access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderClaims {
    /// Provider user id.
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub email: Option<String>,
    /// Audience, `authenticated` for signed-in users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Verifier (and, for refresh and tests, issuer) of provider JWTs.
#[derive(Clone)]
pub struct ProviderJwt {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    audience: Option<String>,
    leeway_secs: u64,
}

impl std::fmt::Debug for ProviderJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderJwt")
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl ProviderJwt {
    /// Creates a verifier for the provider's shared HS256 secret.
    pub fn new(secret: &str, audience: Option<String>, leeway_secs: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidKey("Provider JWT secret is empty".to_string()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            audience,
            leeway_secs,
        })
    }

    /// Validates a token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<ProviderClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let token_data =
            decode::<ProviderClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                    jsonwebtoken::errors::ErrorKind::InvalidToken
                    | jsonwebtoken::errors::ErrorKind::InvalidSignature
                    | jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidToken,
                    _ => JwtError::DecodingError(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Signs a token for `sub`, valid for `ttl_secs`.
    pub fn issue(&self, sub: &str, email: Option<&str>, ttl_secs: i64) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = ProviderClaims {
            sub: sub.to_string(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            email: email.map(str::to_string),
            aud: self.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Seconds until the token expires, clamped at zero.
    pub fn remaining_secs(claims: &ProviderClaims) -> i64 {
        (claims.exp - Utc::now().timestamp()).max(0)
    }
}
