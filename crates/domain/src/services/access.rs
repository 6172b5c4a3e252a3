//! Access constraint derivation.
//!
//! An [`AccessConstraint`] describes the row-level filter every query made on
//! behalf of a caller must satisfy. It is derived from the caller's
//! [`Identity`] for each use and never stored.
//!
//! Two entry points exist:
//! - [`derive_constraints`] maps any (possibly absent) identity to a
//!   constraint. An absent identity yields an unrestricted constraint whose
//!   description says so.
//! - [`require_constraints`] is what request handlers call. It refuses
//!   anonymous callers and scoped roles whose organizational id is missing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Identity, Role};

/// Column holding the diocese reference on scoped tables.
pub const DIOCESE_COLUMN: &str = "diocese_id";
/// Column holding the testing-center reference on scoped tables.
pub const TESTING_CENTER_COLUMN: &str = "testing_center_id";

/// Errors raised when a caller may not access data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("Account is missing its {0} assignment")]
    MissingScope(String),
}

/// Declarative description of what data a caller may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConstraint {
    pub has_constraints: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diocese_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testing_center_id: Option<i32>,
    pub must_include_diocese_filter: bool,
    pub must_include_testing_center_filter: bool,
    pub description: String,
}

/// One `column = value` predicate a scoped query must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFilter {
    pub column: &'static str,
    pub value: i32,
}

impl RequiredFilter {
    pub fn predicate(&self) -> String {
        format!("{} = {}", self.column, self.value)
    }
}

impl AccessConstraint {
    /// No restriction.
    pub fn unrestricted(description: impl Into<String>) -> Self {
        Self {
            has_constraints: false,
            diocese_id: None,
            testing_center_id: None,
            must_include_diocese_filter: false,
            must_include_testing_center_filter: false,
            description: description.into(),
        }
    }

    /// Restricted to one diocese.
    pub fn diocese(diocese_id: Option<i32>) -> Self {
        let description = match diocese_id {
            Some(id) => format!("limited to diocese {}", id),
            None => "limited to a diocese, but the account has no diocese assigned".to_string(),
        };
        Self {
            has_constraints: true,
            diocese_id,
            testing_center_id: None,
            must_include_diocese_filter: true,
            must_include_testing_center_filter: false,
            description,
        }
    }

    /// Restricted to one testing center within a diocese.
    pub fn testing_center(diocese_id: Option<i32>, testing_center_id: Option<i32>) -> Self {
        let description = match (diocese_id, testing_center_id) {
            (Some(d), Some(t)) => format!("limited to testing center {} in diocese {}", t, d),
            _ => "limited to a testing center, but the account assignment is incomplete"
                .to_string(),
        };
        Self {
            has_constraints: true,
            diocese_id,
            testing_center_id,
            must_include_diocese_filter: true,
            must_include_testing_center_filter: true,
            description,
        }
    }

    /// Filters required by this constraint, diocese first.
    ///
    /// A required filter whose id is missing is omitted here; use
    /// [`require_constraints`] to reject such constraints up front.
    pub fn filters(&self) -> Vec<RequiredFilter> {
        if !self.has_constraints {
            return Vec::new();
        }
        let mut filters = Vec::with_capacity(2);
        if self.must_include_diocese_filter {
            if let Some(value) = self.diocese_id {
                filters.push(RequiredFilter {
                    column: DIOCESE_COLUMN,
                    value,
                });
            }
        }
        if self.must_include_testing_center_filter {
            if let Some(value) = self.testing_center_id {
                filters.push(RequiredFilter {
                    column: TESTING_CENTER_COLUMN,
                    value,
                });
            }
        }
        filters
    }

    /// Whether rows of `diocese_id` are visible.
    pub fn allows_diocese(&self, diocese_id: i32) -> bool {
        if !self.has_constraints || !self.must_include_diocese_filter {
            return true;
        }
        self.diocese_id == Some(diocese_id)
    }

    /// Whether rows of a testing center (in `diocese_id`) are visible.
    pub fn allows_testing_center(&self, diocese_id: i32, testing_center_id: i32) -> bool {
        if !self.allows_diocese(diocese_id) {
            return false;
        }
        if !self.has_constraints || !self.must_include_testing_center_filter {
            return true;
        }
        self.testing_center_id == Some(testing_center_id)
    }
}

/// Derives the data scope for a caller.
pub fn derive_constraints(identity: Option<&Identity>) -> AccessConstraint {
    let Some(identity) = identity else {
        return AccessConstraint::unrestricted("no authenticated user");
    };

    match identity.role {
        Role::SuperAdmin => AccessConstraint::unrestricted("super admin: unrestricted access"),
        Role::DioceseManager => AccessConstraint::diocese(identity.diocese_id),
        Role::SchoolManager => {
            AccessConstraint::testing_center(identity.diocese_id, identity.testing_center_id)
        }
    }
}

/// Derives the data scope, refusing anything that cannot be enforced.
pub fn require_constraints(identity: Option<&Identity>) -> Result<AccessConstraint, AccessError> {
    let identity = identity.ok_or(AccessError::Unauthenticated)?;
    let constraint = derive_constraints(Some(identity));

    if constraint.must_include_diocese_filter && constraint.diocese_id.is_none() {
        tracing::warn!(user_id = identity.id, role = %identity.role, "Scoped account has no diocese");
        return Err(AccessError::MissingScope("diocese".to_string()));
    }
    if constraint.must_include_testing_center_filter && constraint.testing_center_id.is_none() {
        tracing::warn!(user_id = identity.id, role = %identity.role, "Scoped account has no testing center");
        return Err(AccessError::MissingScope("testing center".to_string()));
    }
    Ok(constraint)
}

/// Requires the caller to hold at least `role`.
pub fn require_role(identity: &Identity, role: Role) -> Result<(), AccessError> {
    if identity.role.has_at_least(role) {
        Ok(())
    } else {
        Err(AccessError::Forbidden(format!(
            "Insufficient permissions. Required role: {} or higher",
            role
        )))
    }
}

/// Checks that `actor` may create a user with the given role and placement.
///
/// Placement must match the target role (diocese managers need a diocese,
/// school managers need a diocese and a testing center) and fall inside the
/// actor's own scope.
pub fn authorize_user_placement(
    actor: &Identity,
    target_role: Role,
    diocese_id: Option<i32>,
    testing_center_id: Option<i32>,
) -> Result<(), AccessError> {
    if !actor.role.can_manage(target_role) {
        return Err(AccessError::Forbidden(format!(
            "A {} cannot manage {} accounts",
            actor.role, target_role
        )));
    }

    match (target_role, diocese_id, testing_center_id) {
        (Role::SuperAdmin, None, None) => {}
        (Role::SuperAdmin, _, _) => {
            return Err(AccessError::Forbidden(
                "Super admins are not assigned to a diocese or testing center".to_string(),
            ))
        }
        (Role::DioceseManager, Some(_), None) => {}
        (Role::DioceseManager, _, _) => {
            return Err(AccessError::Forbidden(
                "Diocese managers need a diocese and no testing center".to_string(),
            ))
        }
        (Role::SchoolManager, Some(_), Some(_)) => {}
        (Role::SchoolManager, _, _) => {
            return Err(AccessError::Forbidden(
                "School managers need a diocese and a testing center".to_string(),
            ))
        }
    }

    let scope = require_constraints(Some(actor))?;
    if let Some(d) = diocese_id {
        if !scope.allows_diocese(d) {
            return Err(AccessError::Forbidden(
                "Cannot place users outside your diocese".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthMethod;

    fn identity(role: Role, diocese_id: Option<i32>, testing_center_id: Option<i32>) -> Identity {
        Identity {
            id: 1,
            email: "someone@example.org".to_string(),
            username: "someone".to_string(),
            role,
            diocese_id,
            testing_center_id,
            auth_method: AuthMethod::DatabaseSession,
        }
    }

    #[test]
    fn test_absent_identity_is_unrestricted() {
        let c = derive_constraints(None);
        assert!(!c.has_constraints);
        assert_eq!(c.description, "no authenticated user");
        assert!(c.filters().is_empty());
    }

    #[test]
    fn test_super_admin_is_unrestricted() {
        let c = derive_constraints(Some(&identity(Role::SuperAdmin, None, None)));
        assert!(!c.has_constraints);
        assert!(!c.must_include_diocese_filter);
        assert!(!c.must_include_testing_center_filter);
    }

    #[test]
    fn test_diocese_manager_requires_diocese_filter() {
        let c = derive_constraints(Some(&identity(Role::DioceseManager, Some(5), None)));
        assert!(c.has_constraints);
        assert_eq!(c.diocese_id, Some(5));
        assert!(c.must_include_diocese_filter);
        assert!(!c.must_include_testing_center_filter);
        assert_eq!(
            c.filters(),
            vec![RequiredFilter {
                column: "diocese_id",
                value: 5
            }]
        );
        assert_eq!(c.filters()[0].predicate(), "diocese_id = 5");
    }

    #[test]
    fn test_school_manager_requires_both_filters() {
        let c = derive_constraints(Some(&identity(Role::SchoolManager, Some(5), Some(51))));
        assert!(c.has_constraints);
        assert_eq!(c.diocese_id, Some(5));
        assert_eq!(c.testing_center_id, Some(51));
        assert!(c.must_include_diocese_filter);
        assert!(c.must_include_testing_center_filter);
        let predicates: Vec<String> = c.filters().iter().map(|f| f.predicate()).collect();
        assert_eq!(predicates, vec!["diocese_id = 5", "testing_center_id = 51"]);
    }

    #[test]
    fn test_require_constraints_rejects_anonymous() {
        assert_eq!(require_constraints(None), Err(AccessError::Unauthenticated));
    }

    #[test]
    fn test_require_constraints_rejects_missing_scope() {
        assert_eq!(
            require_constraints(Some(&identity(Role::DioceseManager, None, None))),
            Err(AccessError::MissingScope("diocese".to_string()))
        );
        assert_eq!(
            require_constraints(Some(&identity(Role::SchoolManager, Some(5), None))),
            Err(AccessError::MissingScope("testing center".to_string()))
        );
        assert!(require_constraints(Some(&identity(Role::SchoolManager, Some(5), Some(51)))).is_ok());
    }

    #[test]
    fn test_allows_checks() {
        let dm = derive_constraints(Some(&identity(Role::DioceseManager, Some(5), None)));
        assert!(dm.allows_diocese(5));
        assert!(!dm.allows_diocese(6));
        assert!(dm.allows_testing_center(5, 99));
        assert!(!dm.allows_testing_center(6, 99));

        let sm = derive_constraints(Some(&identity(Role::SchoolManager, Some(5), Some(51))));
        assert!(sm.allows_testing_center(5, 51));
        assert!(!sm.allows_testing_center(5, 52));

        let admin = derive_constraints(Some(&identity(Role::SuperAdmin, None, None)));
        assert!(admin.allows_testing_center(1, 2));
    }

    #[test]
    fn test_constraint_serializes_camel_case() {
        let c = derive_constraints(Some(&identity(Role::DioceseManager, Some(5), None)));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["hasConstraints"], true);
        assert_eq!(json["dioceseId"], 5);
        assert_eq!(json["mustIncludeDioceseFilter"], true);
        assert!(json.get("testingCenterId").is_none());
    }

    #[test]
    fn test_require_role() {
        let dm = identity(Role::DioceseManager, Some(5), None);
        assert!(require_role(&dm, Role::SchoolManager).is_ok());
        assert!(matches!(
            require_role(&dm, Role::SuperAdmin),
            Err(AccessError::Forbidden(_))
        ));
    }

    #[test]
    fn test_authorize_user_placement() {
        let admin = identity(Role::SuperAdmin, None, None);
        let dm = identity(Role::DioceseManager, Some(5), None);
        let sm = identity(Role::SchoolManager, Some(5), Some(51));

        assert!(authorize_user_placement(&admin, Role::DioceseManager, Some(7), None).is_ok());
        assert!(authorize_user_placement(&admin, Role::SuperAdmin, None, None).is_ok());
        assert!(authorize_user_placement(&admin, Role::SuperAdmin, Some(7), None).is_err());
        assert!(authorize_user_placement(&admin, Role::DioceseManager, None, None).is_err());

        assert!(authorize_user_placement(&dm, Role::SchoolManager, Some(5), Some(51)).is_ok());
        assert!(authorize_user_placement(&dm, Role::SchoolManager, Some(6), Some(61)).is_err());
        assert!(authorize_user_placement(&dm, Role::SchoolManager, Some(5), None).is_err());
        assert!(authorize_user_placement(&dm, Role::DioceseManager, Some(5), None).is_err());

        assert!(authorize_user_placement(&sm, Role::SchoolManager, Some(5), Some(51)).is_err());
    }
}
