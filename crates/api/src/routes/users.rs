//! User account endpoints.
//!
//! Creation follows the role hierarchy: a SuperAdmin may create anyone, a
//! DioceseManager creates SchoolManagers inside its own diocese.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    map_external_role, role_should_have_access, CreateUserRequest, ExternalRole,
    ExternalUserRecord, Identity, ImportUsersRequest, ImportUsersResponse, ListUsersResponse,
    Role, SkippedUser, User,
};
use domain::services::{authorize_user_placement, AccessConstraint};
use persistence::repositories::{NewUser, TestingCenterRepository, UserRepository};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Scoped;

/// Where an imported account lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub role: Role,
    pub diocese_id: Option<i32>,
    pub testing_center_id: Option<i32>,
}

/// Decides the placement of one external record, or why it is skipped.
///
/// Organizational ids a role does not carry are dropped rather than
/// rejected, since the external system fills them in for everyone.
pub fn plan_import(actor: &Identity, record: &ExternalUserRecord) -> Result<Placement, String> {
    let external = ExternalRole::parse(&record.external_role);
    if !role_should_have_access(&external) {
        return Err(format!("Role '{}' does not get an account", external));
    }

    let role = map_external_role(&external);
    let placement = match role {
        Role::SuperAdmin => Placement {
            role,
            diocese_id: None,
            testing_center_id: None,
        },
        Role::DioceseManager => Placement {
            role,
            diocese_id: record.diocese_id,
            testing_center_id: None,
        },
        Role::SchoolManager => Placement {
            role,
            diocese_id: record.diocese_id,
            testing_center_id: record.testing_center_id,
        },
    };

    authorize_user_placement(
        actor,
        placement.role,
        placement.diocese_id,
        placement.testing_center_id,
    )
    .map_err(|e| e.to_string())?;
    Ok(placement)
}

/// Whether `user` falls inside `constraint` and under `actor`'s authority.
fn can_remove(actor: &Identity, constraint: &AccessConstraint, user: &User) -> bool {
    if actor.id == user.id || !actor.role.can_manage(user.role) {
        return false;
    }
    match (user.diocese_id, user.testing_center_id) {
        (Some(d), Some(tc)) => constraint.allows_testing_center(d, tc),
        (Some(d), None) => constraint.allows_diocese(d),
        (None, _) => !constraint.has_constraints,
    }
}

async fn check_testing_center(
    state: &AppState,
    diocese_id: Option<i32>,
    testing_center_id: Option<i32>,
) -> Result<Option<String>, ApiError> {
    let (Some(d), Some(tc)) = (diocese_id, testing_center_id) else {
        return Ok(None);
    };
    let belongs = TestingCenterRepository::new(state.pool.clone())
        .belongs_to_diocese(tc, d)
        .await?;
    Ok((!belongs).then(|| format!("Testing center {} is not in diocese {}", tc, d)))
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    scoped: Scoped,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let data = UserRepository::new(state.pool.clone())
        .list(&scoped.constraint)
        .await?;
    Ok(Json(ListUsersResponse {
        data,
        scope: scoped.constraint.description,
    }))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    scoped: Scoped,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    request.validate()?;
    authorize_user_placement(
        &scoped.identity,
        request.role,
        request.diocese_id,
        request.testing_center_id,
    )?;

    if let Some(reason) =
        check_testing_center(&state, request.diocese_id, request.testing_center_id).await?
    {
        return Err(ApiError::validation(reason));
    }

    let password_hash = request
        .password
        .as_deref()
        .map(shared::password::hash_password)
        .transpose()
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

    let users = UserRepository::new(state.pool.clone());
    if users.email_exists(&request.email).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = users
        .create(&NewUser {
            email: &request.email,
            username: &request.username,
            password_hash: password_hash.as_deref(),
            role: request.role,
            diocese_id: request.diocese_id,
            testing_center_id: request.testing_center_id,
        })
        .await?;

    tracing::info!(
        user_id = user.id,
        role = %user.role,
        created_by = scoped.identity.id,
        "User created"
    );
    Ok((StatusCode::CREATED, Json(user)))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    scoped: Scoped,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let users = UserRepository::new(state.pool.clone());
    let not_found = || ApiError::NotFound(format!("User {} not found", id));

    let user: User = users
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?
        .try_into()?;

    if !can_remove(&scoped.identity, &scoped.constraint, &user) {
        if scoped.identity.id == user.id {
            return Err(ApiError::Forbidden("You cannot delete your own account".to_string()));
        }
        return Err(not_found());
    }

    if users.delete(id).await? {
        tracing::info!(user_id = id, deleted_by = scoped.identity.id, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

/// POST /api/v1/users/import
///
/// Creates provider-only accounts (no password) for records from the
/// external management system. Records that cannot be imported are listed
/// with a reason instead of failing the batch.
pub async fn import_users(
    State(state): State<AppState>,
    scoped: Scoped,
    Json(request): Json<ImportUsersRequest>,
) -> Result<Json<ImportUsersResponse>, ApiError> {
    request.validate()?;

    let users = UserRepository::new(state.pool.clone());
    let mut imported = Vec::new();
    let mut skipped = Vec::new();
    let skip = |record: &ExternalUserRecord, reason: String| SkippedUser {
        email: record.email.clone(),
        reason,
    };

    for record in &request.users {
        let placement = match plan_import(&scoped.identity, record) {
            Ok(placement) => placement,
            Err(reason) => {
                skipped.push(skip(record, reason));
                continue;
            }
        };

        if let Some(reason) =
            check_testing_center(&state, placement.diocese_id, placement.testing_center_id).await?
        {
            skipped.push(skip(record, reason));
            continue;
        }

        if users.email_exists(&record.email).await? {
            skipped.push(skip(record, "Email already registered".to_string()));
            continue;
        }

        let created = users
            .create(&NewUser {
                email: &record.email,
                username: &record.username,
                password_hash: None,
                role: placement.role,
                diocese_id: placement.diocese_id,
                testing_center_id: placement.testing_center_id,
            })
            .await;
        match created {
            Ok(user) => imported.push(user),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                skipped.push(skip(record, "Email or username already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        imported = imported.len(),
        skipped = skipped.len(),
        imported_by = scoped.identity.id,
        "User import finished"
    );
    Ok(Json(ImportUsersResponse { imported, skipped }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::AuthMethod;
    use domain::services::derive_constraints;

    fn actor(role: Role, diocese_id: Option<i32>) -> Identity {
        Identity {
            id: 1,
            email: "actor@example.org".into(),
            username: "actor".into(),
            role,
            diocese_id,
            testing_center_id: None,
            auth_method: AuthMethod::DatabaseSession,
        }
    }

    fn record(external_role: &str, diocese_id: Option<i32>, tc: Option<i32>) -> ExternalUserRecord {
        ExternalUserRecord {
            email: "new@example.org".into(),
            username: "newuser".into(),
            external_role: external_role.into(),
            diocese_id,
            testing_center_id: tc,
        }
    }

    #[test]
    fn test_plan_import_skips_students() {
        let sa = actor(Role::SuperAdmin, None);
        let reason = plan_import(&sa, &record("Student", Some(5), Some(51))).unwrap_err();
        assert!(reason.contains("Student"));
        assert!(plan_import(&sa, &record("catechist  candidate", Some(5), Some(51))).is_err());
    }

    #[test]
    fn test_plan_import_maps_roles() {
        let sa = actor(Role::SuperAdmin, None);
        assert_eq!(
            plan_import(&sa, &record("Bishop", Some(5), Some(51))).unwrap(),
            Placement {
                role: Role::DioceseManager,
                diocese_id: Some(5),
                testing_center_id: None
            }
        );
        assert_eq!(
            plan_import(&sa, &record("Parish Secretary", Some(5), Some(51)))
                .unwrap()
                .role,
            Role::SchoolManager
        );
    }

    #[test]
    fn test_plan_import_respects_actor_scope() {
        let dm = actor(Role::DioceseManager, Some(5));
        assert!(plan_import(&dm, &record("Teacher", Some(5), Some(51))).is_ok());
        assert!(plan_import(&dm, &record("Teacher", Some(6), Some(61))).is_err());
        assert!(plan_import(&dm, &record("Bishop", Some(5), None)).is_err());
        assert!(plan_import(&dm, &record("Principal", Some(5), None)).is_err());
    }

    #[test]
    fn test_can_remove() {
        let dm = actor(Role::DioceseManager, Some(5));
        let scope = derive_constraints(Some(&dm));
        let user = |id, role, d, tc| User {
            id,
            email: "u@example.org".into(),
            username: "u".into(),
            role,
            diocese_id: d,
            testing_center_id: tc,
            created_at: Utc::now(),
        };

        assert!(can_remove(&dm, &scope, &user(2, Role::SchoolManager, Some(5), Some(51))));
        assert!(!can_remove(&dm, &scope, &user(3, Role::SchoolManager, Some(6), Some(61))));
        assert!(!can_remove(&dm, &scope, &user(4, Role::DioceseManager, Some(5), None)));
        assert!(!can_remove(&dm, &scope, &user(1, Role::SchoolManager, Some(5), Some(51))));

        let sa = actor(Role::SuperAdmin, None);
        let sa_scope = derive_constraints(Some(&sa));
        assert!(can_remove(&sa, &sa_scope, &user(5, Role::SuperAdmin, None, None)));
    }
}
