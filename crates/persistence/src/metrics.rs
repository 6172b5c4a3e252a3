//! Database metrics.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Records how long a named query took.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Counts a failed query by name.
pub fn record_query_error(query_name: &str) {
    counter!("database_query_errors_total", "query" => query_name.to_string()).increment(1);
}

/// Publishes pool size gauges. Called from the readiness probe.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
}

/// Times one repository call.
///
/// ```ignore
/// let timer = QueryTimer::new("find_diocese_by_id");
/// let result = sqlx::query_as::<_, DioceseEntity>(...).fetch_optional(&pool).await;
/// timer.finish(&result)
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Records the elapsed time, and an error count when `result` failed.
    pub fn finish<T>(self, result: Result<T, sqlx::Error>) -> Result<T, sqlx::Error> {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            record_query_error(self.query_name);
            tracing::debug!(query = self.query_name, error = %e, "Query failed");
        }
        result
    }
}
