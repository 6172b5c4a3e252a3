//! Caller identity extractors.
//!
//! The route guard resolves the caller once per request and stores the
//! [`Resolution`] in request extensions. These extractors read it back,
//! resolving directly when the guard did not run (e.g. in isolated tests).

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::Identity;
use domain::services::{require_constraints, AccessConstraint, Resolution};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::auth::resolve_request;

async fn resolution(parts: &mut Parts, state: &AppState) -> Resolution {
    if let Some(resolution) = parts.extensions.get::<Resolution>() {
        return resolution.clone();
    }
    let resolution = resolve_request(state, &parts.headers).await;
    parts.extensions.insert(resolution.clone());
    resolution
}

/// An authenticated caller. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolution(parts, state)
            .await
            .into_identity()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// The caller if there is one. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalCurrentUser(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalCurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalCurrentUser(
            resolution(parts, state).await.into_identity(),
        ))
    }
}

/// An authenticated caller together with the data scope they are held to.
///
/// Goes through the fail-closed gateway: anonymous callers get 401 and
/// scoped accounts missing their organization get 403.
#[derive(Debug, Clone)]
pub struct Scoped {
    pub identity: Identity,
    pub constraint: AccessConstraint,
}

#[async_trait]
impl FromRequestParts<AppState> for Scoped {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolution(parts, state).await.into_identity();
        let constraint = require_constraints(identity.as_ref())?;
        match identity {
            Some(identity) => Ok(Scoped {
                identity,
                constraint,
            }),
            None => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }
}
