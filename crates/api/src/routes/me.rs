//! The caller's own identity and data scope.

use axum::Json;
use domain::models::Identity;
use domain::services::{derive_constraints, AccessConstraint};
use serde::Serialize;

use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: Identity,
    pub home_path: &'static str,
    pub constraint: AccessConstraint,
}

/// GET /api/v1/me
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<MeResponse> {
    let constraint = derive_constraints(Some(&identity));
    Json(MeResponse {
        home_path: identity.role.home_path(),
        constraint,
        user: identity,
    })
}
