//! Bound-parameter scope filters for listing queries.

use domain::services::access::{AccessConstraint, DIOCESE_COLUMN, TESTING_CENTER_COLUMN};
use sqlx::{Postgres, QueryBuilder};

/// Which columns of a table carry the diocese and testing-center references.
#[derive(Debug, Clone, Copy)]
pub struct ScopeColumns {
    pub diocese: Option<&'static str>,
    pub testing_center: Option<&'static str>,
}

impl ScopeColumns {
    pub const DIOCESES: Self = Self {
        diocese: Some("id"),
        testing_center: None,
    };
    pub const TESTING_CENTERS: Self = Self {
        diocese: Some(DIOCESE_COLUMN),
        testing_center: Some("id"),
    };
    pub const USERS: Self = Self {
        diocese: Some(DIOCESE_COLUMN),
        testing_center: Some(TESTING_CENTER_COLUMN),
    };
}

/// Appends the constraint's filters to `builder` as bound parameters.
///
/// `builder` must end right after the `FROM` target; a `WHERE` clause is
/// always opened so callers can continue with `AND ...`. A required filter
/// with no id matches nothing.
pub fn push_scope_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    constraint: &AccessConstraint,
    columns: ScopeColumns,
) {
    builder.push(" WHERE TRUE");

    if !constraint.has_constraints {
        return;
    }

    let required = [
        (
            constraint.must_include_diocese_filter,
            columns.diocese,
            constraint.diocese_id,
        ),
        (
            constraint.must_include_testing_center_filter,
            columns.testing_center,
            constraint.testing_center_id,
        ),
    ];

    for (must_include, column, value) in required {
        if !must_include {
            continue;
        }
        let Some(column) = column else { continue };
        match value {
            Some(value) => {
                builder.push(" AND ").push(column).push(" = ").push_bind(value);
            }
            None => {
                builder.push(" AND FALSE");
            }
        }
    }
}
