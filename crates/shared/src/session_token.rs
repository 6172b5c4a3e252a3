//! Database session token format.
//!
//! Tokens look like `db-<user id>-<issued at, epoch ms>`. Issued tokens carry
//! a fourth segment, an HMAC-SHA256 signature over the first three, so that
//! a token cannot be forged from a known user id and a guessed timestamp.
//! Parsing only needs the first three segments.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::crypto::{hmac_sha256_hex, verify_hmac_sha256_hex};

/// Prefix of every database session token.
pub const TOKEN_PREFIX: &str = "db";

/// Default lifetime of a database session (7 days).
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Error type for session token operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionTokenError {
    #[error("Malformed session token")]
    Malformed,

    #[error("Session token signature is missing")]
    MissingSignature,

    #[error("Session token signature does not match")]
    BadSignature,
}

/// The decoded parts of a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken {
    pub user_id: i32,
    pub issued_at_ms: i64,
}

impl SessionToken {
    /// Issue time as a UTC timestamp, if representable.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.issued_at_ms)
    }
}

/// Builds the unsigned `db-<id>-<epoch-ms>` form.
pub fn format_unsigned(user_id: i32, issued_at: DateTime<Utc>) -> String {
    format!("{}-{}-{}", TOKEN_PREFIX, user_id, issued_at.timestamp_millis())
}

/// Builds a signed token `db-<id>-<epoch-ms>-<signature>`.
pub fn generate(user_id: i32, issued_at: DateTime<Utc>, secret: &[u8]) -> String {
    let unsigned = format_unsigned(user_id, issued_at);
    let signature = hmac_sha256_hex(secret, &unsigned);
    format!("{}-{}", unsigned, signature)
}

/// Decodes a token into its id and timestamp.
///
/// Accepts the unsigned three-segment form and the signed four-segment form.
/// Any other shape, a wrong prefix or a non-numeric id or timestamp is
/// rejected.
pub fn parse(token: &str) -> Result<SessionToken, SessionTokenError> {
    let segments: Vec<&str> = token.split('-').collect();
    if !(segments.len() == 3 || segments.len() == 4) {
        return Err(SessionTokenError::Malformed);
    }
    if segments[0] != TOKEN_PREFIX {
        return Err(SessionTokenError::Malformed);
    }

    let user_id = parse_digits::<i32>(segments[1])?;
    let issued_at_ms = parse_digits::<i64>(segments[2])?;

    if segments.len() == 4 && segments[3].is_empty() {
        return Err(SessionTokenError::Malformed);
    }

    Ok(SessionToken {
        user_id,
        issued_at_ms,
    })
}

/// Extracts the user id, or `None` for anything malformed.
pub fn parse_user_id(token: &str) -> Option<i32> {
    parse(token).ok().map(|t| t.user_id)
}

/// Parses a token and checks its signature.
pub fn verify(token: &str, secret: &[u8]) -> Result<SessionToken, SessionTokenError> {
    let parsed = parse(token)?;
    let (unsigned, signature) = token
        .rsplit_once('-')
        .filter(|(head, _)| head.matches('-').count() == 2)
        .ok_or(SessionTokenError::MissingSignature)?;

    if !verify_hmac_sha256_hex(secret, unsigned, signature) {
        return Err(SessionTokenError::BadSignature);
    }
    Ok(parsed)
}

// `str::parse` accepts a leading `+`, which is not a valid token segment.
fn parse_digits<T: std::str::FromStr>(segment: &str) -> Result<T, SessionTokenError> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SessionTokenError::Malformed);
    }
    segment.parse().map_err(|_| SessionTokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &[u8] = b"test-session-secret";

    #[test]
    fn test_parse_valid_token() {
        assert_eq!(parse_user_id("db-42-1700000000000"), Some(42));
        let token = parse("db-42-1700000000000").unwrap();
        assert_eq!(token.issued_at_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_user_id("db-abc-123"), None);
        assert_eq!(parse_user_id("not-a-token"), None);
        assert_eq!(parse_user_id(""), None);
        assert_eq!(parse_user_id("db-42"), None);
        assert_eq!(parse_user_id("db--123"), None);
        assert_eq!(parse_user_id("db-42-"), None);
        assert_eq!(parse_user_id("xx-42-123"), None);
        assert_eq!(parse_user_id("db-+42-123"), None);
        assert_eq!(parse_user_id("db-42-123-"), None);
        assert_eq!(parse_user_id("db-42-123-abc-def"), None);
    }

    #[test]
    fn test_parse_rejects_overflowing_id() {
        assert_eq!(parse_user_id("db-99999999999-123"), None);
    }

    #[test]
    fn test_generate_and_verify() {
        let issued = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let token = generate(7, issued, SECRET);
        assert!(token.starts_with(&format!("db-7-{}-", issued.timestamp_millis())));

        let verified = verify(&token, SECRET).unwrap();
        assert_eq!(verified.user_id, 7);
        assert_eq!(verified.issued_at(), Some(issued));
        assert_eq!(parse_user_id(&token), Some(7));
    }

    #[test]
    fn test_verify_rejects_unsigned_token() {
        assert_eq!(
            verify("db-42-1700000000000", SECRET),
            Err(SessionTokenError::MissingSignature)
        );
    }

    #[test]
    fn test_verify_rejects_tampered_id() {
        let issued = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let token = generate(7, issued, SECRET);
        let tampered = token.replacen("db-7-", "db-8-", 1);
        assert_eq!(verify(&tampered, SECRET), Err(SessionTokenError::BadSignature));
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let token = generate(7, Utc::now(), SECRET);
        assert_eq!(
            verify(&token, b"another-secret"),
            Err(SessionTokenError::BadSignature)
        );
    }
}
