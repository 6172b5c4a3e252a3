//! User account domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::role::Role;

/// A user account as exposed by the API (never includes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub diocese_id: Option<i32>,
    pub testing_center_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Request to create a user account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,
    /// Omitted for accounts that only sign in through the auth provider.
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: Option<String>,
    pub role: Role,
    pub diocese_id: Option<i32>,
    pub testing_center_id: Option<i32>,
}

/// A user record as exported by the external management system.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUserRecord {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,
    /// Role name in the external vocabulary, e.g. "Principal".
    pub external_role: String,
    pub diocese_id: Option<i32>,
    pub testing_center_id: Option<i32>,
}

/// Request to import users from the external system.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportUsersRequest {
    #[validate(length(min = 1, max = 500, message = "Import must contain 1-500 users"), nested)]
    pub users: Vec<ExternalUserRecord>,
}

/// A record the import did not create, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedUser {
    pub email: String,
    pub reason: String,
}

/// Result of a user import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUsersResponse {
    pub imported: Vec<User>,
    pub skipped: Vec<SkippedUser>,
}

/// Response for list users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    pub data: Vec<User>,
    pub scope: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateUserRequest {
        CreateUserRequest {
            email: "principal@stanne.org".to_string(),
            username: "stanne.principal".to_string(),
            password: Some("long enough".to_string()),
            role: Role::SchoolManager,
            diocese_id: Some(5),
            testing_center_id: Some(51),
        }
    }

    #[test]
    fn test_create_user_validation() {
        assert!(create_request().validate().is_ok());

        let short_password = CreateUserRequest {
            password: Some("short".to_string()),
            ..create_request()
        };
        assert!(short_password.validate().is_err());

        let no_password = CreateUserRequest {
            password: None,
            ..create_request()
        };
        assert!(no_password.validate().is_ok());

        let bad_username = CreateUserRequest {
            username: "no spaces allowed".to_string(),
            ..create_request()
        };
        assert!(bad_username.validate().is_err());
    }

    #[test]
    fn test_import_request_deserializes() {
        let req: ImportUsersRequest = serde_json::from_str(
            r#"{"users": [{"email": "t@x.org", "username": "teacher1", "externalRole": "Teacher", "dioceseId": 5, "testingCenterId": 51}]}"#,
        )
        .unwrap();
        assert_eq!(req.users.len(), 1);
        assert_eq!(req.users[0].external_role, "Teacher");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_import_request_rejects_empty() {
        let req: ImportUsersRequest = serde_json::from_str(r#"{"users": []}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_import_request_validates_nested_records() {
        let req: ImportUsersRequest = serde_json::from_str(
            r#"{"users": [{"email": "not-an-email", "username": "teacher1", "externalRole": "Teacher"}]}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }
}
