//! Read-only execution of assistant SQL.
//!
//! Statements arrive here already constrained and checked by the caller.
//! They run inside a read-only transaction with a statement timeout, and
//! the rows come back as one JSON array built by PostgreSQL.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::metrics::QueryTimer;

/// Limits applied to every assistant statement.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    pub max_rows: i64,
    pub statement_timeout_ms: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_rows: 500,
            statement_timeout_ms: 5_000,
        }
    }
}

/// Wraps `sql` so its rows come back as a single JSON array, capped at
/// `max_rows`. A trailing `;` is dropped.
pub fn wrap_as_json(sql: &str, max_rows: i64) -> String {
    let body = sql.trim();
    let body = body.strip_suffix(';').unwrap_or(body).trim_end();
    format!(
        "SELECT COALESCE(json_agg(t), '[]'::json) FROM (SELECT * FROM ({}) AS q LIMIT {}) AS t",
        body,
        max_rows.max(0)
    )
}

/// Executes assistant SQL against the data tables.
#[derive(Clone)]
pub struct ChatSqlRepository {
    pool: PgPool,
    limits: ExecutionLimits,
}

impl ChatSqlRepository {
    pub fn new(pool: PgPool, limits: ExecutionLimits) -> Self {
        Self { pool, limits }
    }

    /// Runs `sql` read-only and returns its rows as a JSON array.
    pub async fn fetch_json(&self, sql: &str) -> Result<JsonValue, sqlx::Error> {
        let timer = QueryTimer::new("execute_chat_sql");
        let result = self.fetch_json_in_transaction(sql).await;
        timer.finish(result)
    }

    async fn fetch_json_in_transaction(&self, sql: &str) -> Result<JsonValue, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.limits.statement_timeout_ms
        ))
        .execute(&mut *tx)
        .await?;

        let wrapped = wrap_as_json(sql, self.limits.max_rows);
        let rows = sqlx::query_scalar::<_, JsonValue>(&wrapped)
            .fetch_one(&mut *tx)
            .await?;

        tx.rollback().await?;
        Ok(rows)
    }
}
