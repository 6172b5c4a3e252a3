//! Testing center repository for database operations.

use domain::models::{CreateTestingCenterRequest, TestingCenter, UpdateTestingCenterRequest};
use domain::services::AccessConstraint;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::scope::{push_scope_filters, ScopeColumns};
use crate::entities::TestingCenterEntity;
use crate::metrics::QueryTimer;

/// Repository for testing center database operations.
#[derive(Clone)]
pub struct TestingCenterRepository {
    pool: PgPool,
}

impl TestingCenterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists testing centers visible under `constraint`.
    ///
    /// `diocese_id` narrows the listing further when given.
    pub async fn list(
        &self,
        constraint: &AccessConstraint,
        diocese_id: Option<i32>,
    ) -> Result<Vec<TestingCenter>, sqlx::Error> {
        let timer = QueryTimer::new("list_testing_centers");
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, diocese_id, name, address, active, created_at, updated_at FROM testing_centers",
        );
        push_scope_filters(&mut builder, constraint, ScopeColumns::TESTING_CENTERS);
        if let Some(diocese_id) = diocese_id {
            builder.push(" AND diocese_id = ").push_bind(diocese_id);
        }
        builder.push(" ORDER BY name");

        let result = builder
            .build_query_as::<TestingCenterEntity>()
            .fetch_all(&self.pool)
            .await;
        let entities = timer.finish(result)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<TestingCenter>, sqlx::Error> {
        let timer = QueryTimer::new("find_testing_center_by_id");
        let result = sqlx::query_as::<_, TestingCenterEntity>(
            r#"
            SELECT id, diocese_id, name, address, active, created_at, updated_at
            FROM testing_centers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(Into::into))
    }

    pub async fn create(
        &self,
        request: &CreateTestingCenterRequest,
    ) -> Result<TestingCenter, sqlx::Error> {
        let timer = QueryTimer::new("create_testing_center");
        let result = sqlx::query_as::<_, TestingCenterEntity>(
            r#"
            INSERT INTO testing_centers (diocese_id, name, address, active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, diocese_id, name, address, active, created_at, updated_at
            "#,
        )
        .bind(request.diocese_id)
        .bind(request.name.trim())
        .bind(request.address.as_deref())
        .bind(request.active)
        .fetch_one(&self.pool)
        .await;
        Ok(timer.finish(result)?.into())
    }

    pub async fn update(
        &self,
        id: i32,
        request: &UpdateTestingCenterRequest,
    ) -> Result<Option<TestingCenter>, sqlx::Error> {
        let timer = QueryTimer::new("update_testing_center");
        let result = sqlx::query_as::<_, TestingCenterEntity>(
            r#"
            UPDATE testing_centers
            SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                active = COALESCE($4, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, diocese_id, name, address, active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.address.as_deref())
        .bind(request.active)
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(Into::into))
    }

    pub async fn delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_testing_center");
        let result = sqlx::query("DELETE FROM testing_centers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        Ok(timer.finish(result)?.rows_affected() > 0)
    }

    /// Whether `testing_center_id` belongs to `diocese_id`.
    pub async fn belongs_to_diocese(
        &self,
        testing_center_id: i32,
        diocese_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("testing_center_belongs_to_diocese");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM testing_centers WHERE id = $1 AND diocese_id = $2)
            "#,
        )
        .bind(testing_center_id)
        .bind(diocese_id)
        .fetch_one(&self.pool)
        .await;
        timer.finish(result)
    }
}
