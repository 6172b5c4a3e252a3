//! Testing center endpoints, scoped to the caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    CreateTestingCenterRequest, Identity, Role, TestingCenter, UpdateTestingCenterRequest,
};
use persistence::repositories::TestingCenterRepository;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Scoped;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTestingCentersQuery {
    pub diocese_id: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTestingCentersResponse {
    pub data: Vec<TestingCenter>,
    pub scope: String,
}

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Testing center {} not found", id))
}

/// SuperAdmins manage every testing center; a DioceseManager manages the
/// ones in its own diocese.
fn can_manage(identity: &Identity, diocese_id: i32) -> bool {
    match identity.role {
        Role::SuperAdmin => true,
        Role::DioceseManager => identity.diocese_id == Some(diocese_id),
        Role::SchoolManager => false,
    }
}

/// Loads a testing center the caller can see, or 404.
async fn find_visible(
    repo: &TestingCenterRepository,
    scoped: &Scoped,
    id: i32,
) -> Result<TestingCenter, ApiError> {
    repo.find_by_id(id)
        .await?
        .filter(|tc| scoped.constraint.allows_testing_center(tc.diocese_id, tc.id))
        .ok_or_else(|| not_found(id))
}

/// GET /api/v1/testing-centers
pub async fn list_testing_centers(
    State(state): State<AppState>,
    scoped: Scoped,
    Query(query): Query<ListTestingCentersQuery>,
) -> Result<Json<ListTestingCentersResponse>, ApiError> {
    let data = TestingCenterRepository::new(state.pool.clone())
        .list(&scoped.constraint, query.diocese_id)
        .await?;
    Ok(Json(ListTestingCentersResponse {
        data,
        scope: scoped.constraint.description,
    }))
}

/// GET /api/v1/testing-centers/:id
pub async fn get_testing_center(
    State(state): State<AppState>,
    scoped: Scoped,
    Path(id): Path<i32>,
) -> Result<Json<TestingCenter>, ApiError> {
    let repo = TestingCenterRepository::new(state.pool.clone());
    Ok(Json(find_visible(&repo, &scoped, id).await?))
}

/// POST /api/v1/testing-centers
pub async fn create_testing_center(
    State(state): State<AppState>,
    scoped: Scoped,
    Json(request): Json<CreateTestingCenterRequest>,
) -> Result<(StatusCode, Json<TestingCenter>), ApiError> {
    if !can_manage(&scoped.identity, request.diocese_id) {
        return Err(ApiError::Forbidden(
            "Testing centers can only be created in your own diocese".to_string(),
        ));
    }
    request.validate()?;

    let tc = TestingCenterRepository::new(state.pool.clone())
        .create(&request)
        .await?;
    tracing::info!(
        testing_center_id = tc.id,
        diocese_id = tc.diocese_id,
        created_by = scoped.identity.id,
        "Testing center created"
    );
    Ok((StatusCode::CREATED, Json(tc)))
}

/// PUT /api/v1/testing-centers/:id
pub async fn update_testing_center(
    State(state): State<AppState>,
    scoped: Scoped,
    Path(id): Path<i32>,
    Json(request): Json<UpdateTestingCenterRequest>,
) -> Result<Json<TestingCenter>, ApiError> {
    let repo = TestingCenterRepository::new(state.pool.clone());
    let existing = find_visible(&repo, &scoped, id).await?;
    if !can_manage(&scoped.identity, existing.diocese_id) {
        return Err(ApiError::Forbidden(
            "Only a super admin or the diocese's manager can edit this testing center"
                .to_string(),
        ));
    }
    request.validate()?;

    repo.update(id, &request)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/v1/testing-centers/:id
///
/// Refused with 409 while users or student data still reference it.
pub async fn delete_testing_center(
    State(state): State<AppState>,
    scoped: Scoped,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let repo = TestingCenterRepository::new(state.pool.clone());
    let existing = find_visible(&repo, &scoped, id).await?;
    if !can_manage(&scoped.identity, existing.diocese_id) {
        return Err(ApiError::Forbidden(
            "Only a super admin or the diocese's manager can delete this testing center"
                .to_string(),
        ));
    }

    if repo.delete(id).await? {
        tracing::info!(testing_center_id = id, deleted_by = scoped.identity.id, "Testing center deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::AuthMethod;

    #[test]
    fn test_can_manage() {
        let mut dm = Identity {
            id: 2,
            email: "dm@example.org".into(),
            username: "dm".into(),
            role: Role::DioceseManager,
            diocese_id: Some(5),
            testing_center_id: None,
            auth_method: AuthMethod::Provider,
        };
        assert!(can_manage(&dm, 5));
        assert!(!can_manage(&dm, 7));

        dm.role = Role::SchoolManager;
        assert!(!can_manage(&dm, 5));

        dm.role = Role::SuperAdmin;
        assert!(can_manage(&dm, 7));
    }

    #[test]
    fn test_list_query_deserializes() {
        let query: ListTestingCentersQuery = serde_json::from_str(r#"{"dioceseId": 5}"#).unwrap();
        assert_eq!(query.diocese_id, Some(5));
    }
}
