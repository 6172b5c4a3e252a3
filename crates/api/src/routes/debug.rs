//! Data dump for troubleshooting.
//!
//! Only mounted when `debug.enabled` is set, and then only for super admins
//! (see [`crate::middleware::rbac::require_super_admin`]).

use axum::{extract::State, Json};
use domain::services::AccessConstraint;
use persistence::repositories::{
    DataSnapshot, DebugRepository, DioceseRepository, TestingCenterRepository, UserRepository,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

/// GET /api/v1/debug/data
pub async fn debug_data(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<DataSnapshot>, ApiError> {
    tracing::warn!(user_id = identity.id, "Debug data snapshot requested");

    let everything = AccessConstraint::unrestricted("debug snapshot");
    let counts = DebugRepository::new(state.pool.clone()).table_counts().await?;
    let dioceses = DioceseRepository::new(state.pool.clone())
        .list(&everything)
        .await?;
    let testing_centers = TestingCenterRepository::new(state.pool.clone())
        .list(&everything, None)
        .await?;
    let users = UserRepository::new(state.pool.clone())
        .list(&everything)
        .await?;

    Ok(Json(DataSnapshot {
        counts,
        dioceses,
        testing_centers,
        users,
    }))
}
