//! Diocese and testing center domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level organizational unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diocese {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a diocese.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDioceseRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub contact_email: Option<String>,
}

/// Request to update a diocese. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDioceseRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub contact_email: Option<String>,
}

/// A school-like unit belonging to exactly one diocese.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestingCenter {
    pub id: i32,
    pub diocese_id: i32,
    pub name: String,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a testing center.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestingCenterRequest {
    pub diocese_id: i32,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Request to update a testing center. The owning diocese cannot change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTestingCenterRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
    pub active: Option<bool>,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_diocese_validation() {
        let ok = CreateDioceseRequest {
            name: "Diocese of Example".to_string(),
            address: None,
            contact_email: Some("office@example.org".to_string()),
        };
        assert!(ok.validate().is_ok());

        let bad_email = CreateDioceseRequest {
            contact_email: Some("nope".to_string()),
            ..ok.clone()
        };
        assert!(bad_email.validate().is_err());

        let empty_name = CreateDioceseRequest {
            name: String::new(),
            ..ok
        };
        assert!(empty_name.validate().is_err());
    }

    #[test]
    fn test_create_testing_center_defaults_active() {
        let req: CreateTestingCenterRequest =
            serde_json::from_str(r#"{"dioceseId": 5, "name": "St. Anne"}"#).unwrap();
        assert!(req.active);
        assert_eq!(req.diocese_id, 5);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_requests_allow_empty_body() {
        let req: UpdateTestingCenterRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_ok());
        let req: UpdateDioceseRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_ok());
    }
}
