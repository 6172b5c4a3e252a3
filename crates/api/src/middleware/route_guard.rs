//! Route guard.
//!
//! Runs on every request except static assets. It handles `/logout`,
//! keeps the auth provider's access cookie alive, resolves the caller once
//! and stores the [`Resolution`] for extractors, and optionally enforces
//! the role-gated dashboard sections.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use domain::models::{role::required_role_for_path, Identity};
use shared::jwt::ProviderJwt;

use crate::app::AppState;
use crate::middleware::metrics::record_guard_redirect;
use crate::services::auth::{resolve_request, revoke_session};
use crate::services::cookies::{extract_cookie, CookieHelper, PROVIDER_ACCESS_COOKIE};

pub const LOGOUT_PATH: &str = "/logout";

const STATIC_PREFIXES: [&str; 2] = ["/_next/", "/static/"];
const STATIC_EXTENSIONS: [&str; 9] = [
    ".png", ".jpg", ".jpeg", ".svg", ".gif", ".ico", ".css", ".js", ".webp",
];

const SIGN_IN_MESSAGE: &str = "Please%20sign%20in%20to%20continue";
const NO_ACCESS_MESSAGE: &str = "You%20do%20not%20have%20access%20to%20that%20page";

/// Paths the guard never touches.
pub fn is_static_asset(path: &str) -> bool {
    if path == "/favicon.ico" || STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }
    let lower = path.to_ascii_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Where to send a caller who may not open `path`, if anywhere.
pub fn redirect_for(path: &str, identity: Option<&Identity>) -> Option<String> {
    let required = required_role_for_path(path)?;
    match identity {
        None => Some(format!("/login?message={}", SIGN_IN_MESSAGE)),
        Some(identity) if !identity.role.has_at_least(required) => Some(format!(
            "{}?message={}",
            identity.role.home_path(),
            NO_ACCESS_MESSAGE
        )),
        Some(_) => None,
    }
}

/// Re-issues the provider access cookie with a fresh Max-Age when it holds
/// a valid JWT. The Max-Age never outlives the token itself.
pub fn refreshed_provider_cookie(
    headers: &HeaderMap,
    provider: Option<&ProviderJwt>,
    cookies: &CookieHelper,
    max_age_secs: i64,
) -> Option<String> {
    let provider = provider?;
    let token = extract_cookie(headers, PROVIDER_ACCESS_COOKIE)?;
    let claims = provider.verify(token).ok()?;
    let max_age = max_age_secs.min(ProviderJwt::remaining_secs(&claims));
    (max_age > 0).then(|| cookies.build_cookie(PROVIDER_ACCESS_COOKIE, token, max_age))
}

async fn logout(state: &AppState, headers: &HeaderMap) -> Response {
    if let Err(e) = revoke_session(state, headers).await {
        tracing::warn!(error = %e, "Failed to revoke session on logout");
    }
    let mut response = Redirect::to("/").into_response();
    state.cookies().add_clear_auth_cookies(response.headers_mut());
    response
}

pub async fn route_guard(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if is_static_asset(&path) {
        return next.run(req).await;
    }

    if path == LOGOUT_PATH {
        return logout(&state, req.headers()).await;
    }

    let refreshed = refreshed_provider_cookie(
        req.headers(),
        state.provider_jwt.as_deref(),
        &state.cookies(),
        state.config.provider.cookie_max_age_secs,
    );

    let resolution = resolve_request(&state, req.headers()).await;

    let mut response = match state
        .config
        .route_guard
        .enforce_roles
        .then(|| redirect_for(&path, resolution.identity()))
        .flatten()
    {
        Some(location) => {
            record_guard_redirect(if resolution.is_authenticated() {
                "role"
            } else {
                "anonymous"
            });
            tracing::debug!(path = %path, location = %location, "Route guard redirect");
            Redirect::to(&location).into_response()
        }
        None => {
            req.extensions_mut().insert(resolution);
            next.run(req).await
        }
    };

    if let Some(cookie) = refreshed {
        CookieHelper::append(response.headers_mut(), &cookie);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CookieConfig;
    use axum::http::{header::COOKIE, HeaderValue};
    use domain::models::{AuthMethod, Role};

    fn identity(role: Role) -> Identity {
        Identity {
            id: 1,
            email: "u@example.org".into(),
            username: "u".into(),
            role,
            diocese_id: Some(5),
            testing_center_id: Some(51),
            auth_method: AuthMethod::DatabaseSession,
        }
    }

    #[test]
    fn test_static_assets_bypass() {
        for path in [
            "/_next/static/chunk.js",
            "/static/logo",
            "/favicon.ico",
            "/images/crest.PNG",
            "/styles/site.css",
            "/img/a.webp",
        ] {
            assert!(is_static_asset(path), "{path}");
        }
        for path in ["/admin", "/api/v1/me", "/logout", "/jsonfeed"] {
            assert!(!is_static_asset(path), "{path}");
        }
    }

    #[test]
    fn test_redirect_anonymous_to_login() {
        assert_eq!(
            redirect_for("/admin/users", None).as_deref(),
            Some("/login?message=Please%20sign%20in%20to%20continue")
        );
        assert!(redirect_for("/app", None).is_some());
        assert!(redirect_for("/", None).is_none());
        assert!(redirect_for("/api/v1/me", None).is_none());
    }

    #[test]
    fn test_redirect_under_privileged_to_home() {
        let dm = identity(Role::DioceseManager);
        let location = redirect_for("/admin", Some(&dm)).unwrap();
        assert!(location.starts_with("/diocese-manager?message="));
        assert!(redirect_for("/diocese-manager/centers", Some(&dm)).is_none());
        assert!(redirect_for("/school-manager", Some(&dm)).is_none());

        let sm = identity(Role::SchoolManager);
        assert!(redirect_for("/diocese-manager", Some(&sm))
            .unwrap()
            .starts_with("/school-manager?"));
        assert!(redirect_for("/app/chat", Some(&sm)).is_none());

        let sa = identity(Role::SuperAdmin);
        assert!(redirect_for("/admin", Some(&sa)).is_none());
    }

    fn cookie_helper() -> CookieHelper {
        CookieHelper::new(CookieConfig {
            secure: true,
            same_site: "Lax".into(),
            domain: String::new(),
            path: "/".into(),
        })
    }

    #[test]
    fn test_provider_cookie_refresh() {
        let provider = ProviderJwt::new("provider-secret", None, 0).unwrap();
        let jwt = provider.issue("sub-1", None, 600).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("sb-access-token={}", jwt)).unwrap(),
        );

        let cookie =
            refreshed_provider_cookie(&headers, Some(&provider), &cookie_helper(), 3600).unwrap();
        assert!(cookie.starts_with(&format!("sb-access-token={}; Path=/; Max-Age=", jwt)));
        let max_age: i64 = cookie
            .split("Max-Age=")
            .nth(1)
            .and_then(|rest| rest.split(';').next())
            .unwrap()
            .parse()
            .unwrap();
        assert!(max_age > 0 && max_age <= 600);

        assert!(refreshed_provider_cookie(&headers, None, &cookie_helper(), 3600).is_none());
    }

    #[test]
    fn test_invalid_provider_cookie_not_refreshed() {
        let provider = ProviderJwt::new("provider-secret", None, 0).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sb-access-token=garbage"));
        assert!(
            refreshed_provider_cookie(&headers, Some(&provider), &cookie_helper(), 3600).is_none()
        );
    }
}
