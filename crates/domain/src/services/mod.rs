//! Access control services.

pub mod access;
pub mod query_constraint;
pub mod session;

pub use access::{
    authorize_user_placement, derive_constraints, require_constraints, require_role,
    AccessConstraint, AccessError, RequiredFilter,
};
pub use query_constraint::{
    apply_constraints, check_scope, hide_credentials, inject_constraints, is_read_only,
    missing_filters, Injection, ScopeViolation,
};
pub use session::{AuthEvidence, IdentityStore, IdentityStoreError, Resolution, SessionResolver};
