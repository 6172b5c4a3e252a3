//! Authentication cookie helpers.
//!
//! Three cookies carry authentication: the database session token and the
//! auth provider's access and refresh tokens. Logout clears all three.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::config::CookieConfig;

/// Database session cookie (`db-<id>-<epoch-ms>-<sig>`).
pub const SESSION_COOKIE: &str = "db-auth-token";
/// Auth provider access token cookie.
pub const PROVIDER_ACCESS_COOKIE: &str = "sb-access-token";
/// Auth provider refresh token cookie.
pub const PROVIDER_REFRESH_COOKIE: &str = "sb-refresh-token";

/// Every cookie cleared on logout.
pub const AUTH_COOKIES: [&str; 3] = [SESSION_COOKIE, PROVIDER_ACCESS_COOKIE, PROVIDER_REFRESH_COOKIE];

/// Builds Set-Cookie values with the configured security attributes.
#[derive(Debug, Clone)]
pub struct CookieHelper {
    config: CookieConfig,
}

impl CookieHelper {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    /// Build a Set-Cookie header value that stores `value` for `max_age_secs`.
    pub fn build_cookie(&self, name: &str, value: &str, max_age_secs: i64) -> String {
        let cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            name,
            value,
            self.config.path,
            max_age_secs.max(0)
        );
        self.with_attributes(cookie)
    }

    /// Build a Set-Cookie header value that expires `name` immediately.
    pub fn build_clear_cookie(&self, name: &str) -> String {
        let cookie = format!(
            "{}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            name, self.config.path
        );
        self.with_attributes(cookie)
    }

    /// Append a Set-Cookie header.
    pub fn append(headers: &mut HeaderMap, cookie: &str) {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Append Set-Cookie headers clearing every authentication cookie.
    pub fn add_clear_auth_cookies(&self, headers: &mut HeaderMap) {
        for name in AUTH_COOKIES {
            Self::append(headers, &self.build_clear_cookie(name));
        }
    }

    fn with_attributes(&self, mut cookie: String) -> String {
        cookie.push_str("; HttpOnly");

        if self.config.secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str(&format!("; SameSite={}", self.config.same_site));

        if !self.config.domain.is_empty() {
            cookie.push_str(&format!("; Domain={}", self.config.domain));
        }

        cookie
    }
}

/// Extract a cookie value from request headers by name.
///
/// Looks through every `Cookie` header; the first match wins.
pub fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .find_map(|cookie| {
            let (cookie_name, cookie_value) = cookie.trim().split_once('=')?;
            (cookie_name == name && !cookie_value.is_empty()).then_some(cookie_value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper(secure: bool, domain: &str) -> CookieHelper {
        CookieHelper::new(CookieConfig {
            secure,
            same_site: "Lax".to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
        })
    }

    #[test]
    fn test_build_cookie() {
        let cookie = helper(true, "").build_cookie(SESSION_COOKIE, "db-1-2-ab", 604800);
        assert_eq!(
            cookie,
            "db-auth-token=db-1-2-ab; Path=/; Max-Age=604800; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn test_build_cookie_with_domain_insecure() {
        let cookie = helper(false, "example.org").build_cookie(PROVIDER_ACCESS_COOKIE, "jwt", 60);
        assert!(!cookie.contains("Secure"));
        assert!(cookie.ends_with("; Domain=example.org"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = helper(true, "").build_clear_cookie(SESSION_COOKIE);
        assert!(cookie.starts_with("db-auth-token=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970"));
    }

    #[test]
    fn test_add_clear_auth_cookies() {
        let mut headers = HeaderMap::new();
        helper(true, "").add_clear_auth_cookies(&mut headers);
        let values: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values.len(), 3);
        for name in AUTH_COOKIES {
            assert!(values.iter().any(|v| v.starts_with(&format!("{}=;", name))));
        }
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; db-auth-token=db-42-1700000000000; sb-access-token="),
        );
        assert_eq!(
            extract_cookie(&headers, SESSION_COOKIE),
            Some("db-42-1700000000000")
        );
        assert_eq!(extract_cookie(&headers, "theme"), Some("dark"));
        assert_eq!(extract_cookie(&headers, PROVIDER_ACCESS_COOKIE), None);
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }
}
