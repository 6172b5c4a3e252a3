//! Diocese repository for database operations.

use domain::models::{CreateDioceseRequest, Diocese, UpdateDioceseRequest};
use domain::services::AccessConstraint;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::scope::{push_scope_filters, ScopeColumns};
use crate::entities::DioceseEntity;
use crate::metrics::QueryTimer;

const DIOCESE_COLUMNS: &str = "id, name, address, contact_email, created_at, updated_at";

/// Repository for diocese database operations.
#[derive(Clone)]
pub struct DioceseRepository {
    pool: PgPool,
}

impl DioceseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists the dioceses visible under `constraint`, by name.
    pub async fn list(&self, constraint: &AccessConstraint) -> Result<Vec<Diocese>, sqlx::Error> {
        let timer = QueryTimer::new("list_dioceses");
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM dioceses", DIOCESE_COLUMNS));
        push_scope_filters(&mut builder, constraint, ScopeColumns::DIOCESES);
        builder.push(" ORDER BY name");

        let result = builder
            .build_query_as::<DioceseEntity>()
            .fetch_all(&self.pool)
            .await;
        let entities = timer.finish(result)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Find a diocese by ID.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Diocese>, sqlx::Error> {
        let timer = QueryTimer::new("find_diocese_by_id");
        let result = sqlx::query_as::<_, DioceseEntity>(
            r#"
            SELECT id, name, address, contact_email, created_at, updated_at
            FROM dioceses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(Into::into))
    }

    pub async fn create(&self, request: &CreateDioceseRequest) -> Result<Diocese, sqlx::Error> {
        let timer = QueryTimer::new("create_diocese");
        let result = sqlx::query_as::<_, DioceseEntity>(
            r#"
            INSERT INTO dioceses (name, address, contact_email)
            VALUES ($1, $2, $3)
            RETURNING id, name, address, contact_email, created_at, updated_at
            "#,
        )
        .bind(request.name.trim())
        .bind(request.address.as_deref())
        .bind(request.contact_email.as_deref())
        .fetch_one(&self.pool)
        .await;
        Ok(timer.finish(result)?.into())
    }

    /// Update a diocese. Absent fields keep their value.
    pub async fn update(
        &self,
        id: i32,
        request: &UpdateDioceseRequest,
    ) -> Result<Option<Diocese>, sqlx::Error> {
        let timer = QueryTimer::new("update_diocese");
        let result = sqlx::query_as::<_, DioceseEntity>(
            r#"
            UPDATE dioceses
            SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                contact_email = COALESCE($4, contact_email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, address, contact_email, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.address.as_deref())
        .bind(request.contact_email.as_deref())
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(Into::into))
    }

    /// Delete a diocese. Returns `false` if it did not exist.
    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_diocese");
        let result = sqlx::query("DELETE FROM dioceses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        Ok(timer.finish(result)?.rows_affected() > 0)
    }
}
