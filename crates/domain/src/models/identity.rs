//! Resolved caller identity.

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Which authentication mechanism produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Custom `db-auth-token` cookie backed by the `sessions` table.
    DatabaseSession,
    /// Managed auth provider session cookie.
    Provider,
}

/// The caller of a request, resolved fresh for every request.
///
/// A testing-center reference, when present, belongs to the referenced
/// diocese; the database enforces this, not this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub diocese_id: Option<i32>,
    pub testing_center_id: Option<i32>,
    pub auth_method: AuthMethod,
}

impl Identity {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_serializes_camel_case() {
        let identity = Identity {
            id: 3,
            email: "dm@example.org".to_string(),
            username: "dm".to_string(),
            role: Role::DioceseManager,
            diocese_id: Some(5),
            testing_center_id: None,
            auth_method: AuthMethod::DatabaseSession,
        };
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["dioceseId"], 5);
        assert_eq!(json["role"], "diocese_manager");
        assert_eq!(json["authMethod"], "database_session");
        assert!(json["testingCenterId"].is_null());
        assert!(!identity.is_super_admin());
    }
}
