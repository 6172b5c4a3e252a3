//! Role-based route layers.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::Role;
use domain::services::{require_role, AccessError, Resolution};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::auth::resolve_request;

/// Rejects anyone but a SuperAdmin: 401 when anonymous, 403 otherwise.
pub async fn require_super_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let resolution = match req.extensions().get::<Resolution>() {
        Some(resolution) => resolution.clone(),
        None => resolve_request(&state, req.headers()).await,
    };

    let outcome = resolution
        .identity()
        .ok_or(AccessError::Unauthenticated)
        .and_then(|identity| require_role(identity, Role::SuperAdmin));
    if let Err(e) = outcome {
        return ApiError::from(e).into_response();
    }

    req.extensions_mut().insert(resolution);
    next.run(req).await
}
