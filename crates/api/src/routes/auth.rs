//! Email/password login and logout for database sessions.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::{AuthMethod, Identity};
use persistence::repositories::UserRepository;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_login;
use crate::services::auth::{issue_session, revoke_session};
use crate::services::cookies::{CookieHelper, SESSION_COOKIE};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: Identity,
    /// Where the client should navigate next.
    pub redirect_to: &'static str,
    pub expires_in: i64,
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// POST /api/v1/auth/login
///
/// Sets the `db-auth-token` cookie on success. Unknown email, provider-only
/// account and wrong password all answer with the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let users = UserRepository::new(state.pool.clone());
    let Some(user) = users.find_by_email(&request.email).await? else {
        record_login("unknown_email");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let Some(hash) = user.password_hash.as_deref() else {
        record_login("no_password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let matches = shared::password::verify_password(&request.password, hash)
        .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))?;
    if !matches {
        record_login("bad_password");
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let identity = user.into_identity(AuthMethod::DatabaseSession).map_err(|e| {
        tracing::warn!(error = %e, "Login for account with unusable role");
        ApiError::Forbidden("Account role is not recognized".to_string())
    })?;

    let token = issue_session(&state, &identity).await?;
    record_login("success");
    tracing::info!(user_id = identity.id, role = %identity.role, "User logged in");

    let ttl = state.config.session.ttl_secs;
    let mut headers = HeaderMap::new();
    CookieHelper::append(
        &mut headers,
        &state.cookies().build_cookie(SESSION_COOKIE, &token, ttl),
    );

    let body = LoginResponse {
        redirect_to: identity.role.home_path(),
        user: identity,
        expires_in: ttl,
    };
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

/// POST /api/v1/auth/logout
///
/// Revokes the session row and clears every auth cookie. Always 204.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match revoke_session(&state, &headers).await {
        Ok(true) => tracing::info!("Session revoked"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to revoke session"),
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    state.cookies().add_clear_auth_cookies(response.headers_mut());
    response
}
