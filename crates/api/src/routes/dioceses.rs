//! Diocese endpoints.
//!
//! Listing and lookup are scoped to the caller. Only a SuperAdmin creates
//! or deletes dioceses; a DioceseManager may edit its own.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{CreateDioceseRequest, Diocese, Identity, Role, UpdateDioceseRequest};
use domain::services::require_role;
use persistence::repositories::DioceseRepository;
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Scoped;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDiocesesResponse {
    pub data: Vec<Diocese>,
    pub scope: String,
}

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Diocese {} not found", id))
}

/// Whether `identity` may edit diocese `id`.
fn can_edit(identity: &Identity, id: i32) -> bool {
    match identity.role {
        Role::SuperAdmin => true,
        Role::DioceseManager => identity.diocese_id == Some(id),
        Role::SchoolManager => false,
    }
}

/// GET /api/v1/dioceses
pub async fn list_dioceses(
    State(state): State<AppState>,
    scoped: Scoped,
) -> Result<Json<ListDiocesesResponse>, ApiError> {
    let data = DioceseRepository::new(state.pool.clone())
        .list(&scoped.constraint)
        .await?;
    Ok(Json(ListDiocesesResponse {
        data,
        scope: scoped.constraint.description,
    }))
}

/// GET /api/v1/dioceses/:id
///
/// Out-of-scope dioceses answer 404, not 403.
pub async fn get_diocese(
    State(state): State<AppState>,
    scoped: Scoped,
    Path(id): Path<i32>,
) -> Result<Json<Diocese>, ApiError> {
    if !scoped.constraint.allows_diocese(id) {
        return Err(not_found(id));
    }
    DioceseRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /api/v1/dioceses
pub async fn create_diocese(
    State(state): State<AppState>,
    scoped: Scoped,
    Json(request): Json<CreateDioceseRequest>,
) -> Result<(StatusCode, Json<Diocese>), ApiError> {
    require_role(&scoped.identity, Role::SuperAdmin)?;
    request.validate()?;

    let diocese = DioceseRepository::new(state.pool.clone())
        .create(&request)
        .await?;
    tracing::info!(diocese_id = diocese.id, created_by = scoped.identity.id, "Diocese created");
    Ok((StatusCode::CREATED, Json(diocese)))
}

/// PUT /api/v1/dioceses/:id
pub async fn update_diocese(
    State(state): State<AppState>,
    scoped: Scoped,
    Path(id): Path<i32>,
    Json(request): Json<UpdateDioceseRequest>,
) -> Result<Json<Diocese>, ApiError> {
    if !scoped.constraint.allows_diocese(id) {
        return Err(not_found(id));
    }
    if !can_edit(&scoped.identity, id) {
        return Err(ApiError::Forbidden(
            "Only a super admin or the diocese's manager can edit it".to_string(),
        ));
    }
    request.validate()?;

    DioceseRepository::new(state.pool.clone())
        .update(id, &request)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/v1/dioceses/:id
///
/// Refused with 409 while testing centers or users still reference it.
pub async fn delete_diocese(
    State(state): State<AppState>,
    scoped: Scoped,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    require_role(&scoped.identity, Role::SuperAdmin)?;

    if DioceseRepository::new(state.pool.clone()).delete(id).await? {
        tracing::info!(diocese_id = id, deleted_by = scoped.identity.id, "Diocese deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::AuthMethod;

    fn identity(role: Role, diocese_id: Option<i32>) -> Identity {
        Identity {
            id: 1,
            email: "x@example.org".into(),
            username: "x".into(),
            role,
            diocese_id,
            testing_center_id: None,
            auth_method: AuthMethod::DatabaseSession,
        }
    }

    #[test]
    fn test_can_edit() {
        assert!(can_edit(&identity(Role::SuperAdmin, None), 9));
        assert!(can_edit(&identity(Role::DioceseManager, Some(5)), 5));
        assert!(!can_edit(&identity(Role::DioceseManager, Some(5)), 6));
        assert!(!can_edit(&identity(Role::SchoolManager, Some(5)), 5));
    }
}
