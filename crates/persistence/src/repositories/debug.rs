//! Data snapshot for the debug endpoint.

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::metrics::QueryTimer;

/// Row counts for every table.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    pub dioceses: i64,
    pub testing_centers: i64,
    pub users: i64,
    pub sessions: i64,
    pub chats: i64,
    pub students: i64,
    pub test_results: i64,
}

/// Snapshot returned by the debug endpoint. Never includes password
/// hashes or session token hashes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSnapshot {
    pub counts: TableCounts,
    pub dioceses: Vec<domain::models::Diocese>,
    pub testing_centers: Vec<domain::models::TestingCenter>,
    pub users: Vec<domain::models::User>,
}

#[derive(Clone)]
pub struct DebugRepository {
    pool: PgPool,
}

impl DebugRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn table_counts(&self) -> Result<TableCounts, sqlx::Error> {
        let timer = QueryTimer::new("debug_table_counts");
        let result = sqlx::query_as::<_, TableCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM dioceses) AS dioceses,
                (SELECT COUNT(*) FROM testing_centers) AS testing_centers,
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM sessions) AS sessions,
                (SELECT COUNT(*) FROM chats) AS chats,
                (SELECT COUNT(*) FROM students) AS students,
                (SELECT COUNT(*) FROM test_results) AS test_results
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.finish(result)
    }
}
