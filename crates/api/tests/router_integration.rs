//! Router-level behavior that needs no database: authentication refusal,
//! logout, the route guard, response headers and the debug gate.

mod common;

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_live_probe() {
    let response = send(test_app(&[]), get("/api/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
    assert_eq!(body_json(response).await["status"], "alive");
}

#[tokio::test]
async fn test_request_id_echoed() {
    let request = Request::builder()
        .uri("/api/health/live")
        .header("x-request-id", "trace-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = send(test_app(&[]), request).await;
    assert_eq!(response.headers()["x-request-id"], "trace-abc-123");
}

#[tokio::test]
async fn test_protected_routes_require_authentication() {
    for uri in [
        "/api/v1/me",
        "/api/v1/dioceses",
        "/api/v1/testing-centers",
        "/api/v1/users",
        "/api/v1/chats",
    ] {
        let response = send(test_app(&[]), get(uri)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body_json(response).await["error"], "unauthorized", "{uri}");
    }
}

#[tokio::test]
async fn test_chat_query_requires_authentication() {
    let response = send(
        test_app(&[]),
        post_json("/api/v1/chat/query", json!({ "question": "How many students?" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsigned_session_cookie_is_anonymous() {
    let request = Request::builder()
        .uri("/api/v1/me")
        .header(header::COOKIE, "db-auth-token=db-1-1700000000000")
        .body(Body::empty())
        .unwrap();
    let response = send(test_app(&[]), request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_validates_before_lookup() {
    let response = send(
        test_app(&[]),
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "not-an-email", "password": "x" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_logout_clears_cookies_and_redirects() {
    let response = send(test_app(&[]), get("/logout")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let cleared: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cleared.len(), 3);
    for name in ["db-auth-token", "sb-access-token", "sb-refresh-token"] {
        assert!(
            cleared
                .iter()
                .any(|c| c.starts_with(&format!("{name}=;")) && c.contains("Max-Age=0")),
            "{name} not cleared"
        );
    }
}

#[tokio::test]
async fn test_api_logout_clears_cookies() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = send(test_app(&[]), request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 3);
}

#[tokio::test]
async fn test_role_enforcement_off_by_default() {
    let response = send(test_app(&[]), get("/admin")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_enforcement_redirects_anonymous_to_login() {
    let app = test_app(&[("route_guard.enforce_roles", "true")]);
    let response = send(app, get("/diocese-manager/centers")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("/login?message="));
}

#[tokio::test]
async fn test_static_assets_bypass_guard() {
    let app = test_app(&[("route_guard.enforce_roles", "true")]);
    let response = send(app, get("/admin/crest.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ungated_paths_pass_guard() {
    let app = test_app(&[("route_guard.enforce_roles", "true")]);
    let response = send(app, get("/api/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_debug_endpoint_hidden_when_disabled() {
    let response = send(test_app(&[]), get("/api/v1/debug/data")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debug_endpoint_requires_super_admin_when_enabled() {
    let app = test_app(&[("debug.enabled", "true")]);
    let response = send(app, get("/api/v1/debug/data")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
