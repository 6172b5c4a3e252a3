//! Security response headers.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Env switch for HSTS; only turn it on behind real TLS termination.
pub const HSTS_ENV: &str = "DM__SECURITY__HSTS_ENABLED";

fn hsts_enabled() -> bool {
    std::env::var(HSTS_ENV)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Adds nosniff, frame denial, referrer policy and (optionally) HSTS.
///
/// Session-bearing responses must never be cached by intermediaries, so
/// anything under `/api/` also gets `Cache-Control: no-store` unless the
/// handler set its own.
pub async fn security_headers_middleware(req: Request<Body>, next: Next) -> Response {
    let is_api = req.uri().path().starts_with("/api/");
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if is_api && !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    if hsts_enabled() {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_headers_added() {
        let app = Router::new()
            .route("/api/v1/me", get(|| async { "ok" }))
            .route("/login", get(|| async { "page" }))
            .layer(middleware::from_fn(security_headers_middleware));

        let response = app
            .clone()
            .oneshot(Request::get("/api/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["cache-control"], "no-store");

        let response = app
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get("cache-control").is_none());
    }
}
