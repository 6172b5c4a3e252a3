//! Chat SQL assistant endpoint.
//!
//! Pipeline: rate limit, scope, generate (or take caller SQL), read-only
//! check, table and name allowlist for scoped callers, constraint injection,
//! verification that every required filter is enforced, read-only
//! execution. Nothing reaches the database unless the statement carries the
//! caller's scope.

use axum::{extract::State, Json};
use domain::models::{ChatAuthor, ChatMessage, ChatQueryRequest, ChatQueryResponse};
use domain::services::{
    apply_constraints, check_scope, hide_credentials, is_read_only, missing_filters,
    AccessConstraint, Injection,
};
use persistence::repositories::{ChatRepository, ChatSqlRepository, ExecutionLimits};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Scoped;
use crate::middleware::metrics::{record_constraint_injection, record_query_rejection};

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryInput<'a> {
    Question(&'a str),
    Sql(&'a str),
}

impl<'a> QueryInput<'a> {
    pub fn from_request(request: &'a ChatQueryRequest) -> Result<Self, ApiError> {
        match (request.question.as_deref(), request.sql.as_deref()) {
            (Some(question), None) => Ok(QueryInput::Question(question.trim())),
            (None, Some(sql)) => Ok(QueryInput::Sql(sql.trim())),
            (Some(_), Some(_)) => Err(ApiError::validation(
                "Provide either a question or SQL, not both",
            )),
            (None, None) => Err(ApiError::validation("A question or SQL is required")),
        }
    }

    fn text(&self) -> &'a str {
        match self {
            QueryInput::Question(text) | QueryInput::Sql(text) => text,
        }
    }
}

/// Constrains `sql` to `constraint` and refuses it if that cannot be done.
pub fn prepare_statement(sql: &str, constraint: &AccessConstraint) -> Result<Injection, ApiError> {
    if !is_read_only(sql) {
        record_query_rejection("not_read_only");
        return Err(ApiError::QueryRejected(
            "Only a single read-only SELECT statement can be run".to_string(),
        ));
    }

    if let Err(violation) = check_scope(sql, constraint) {
        record_query_rejection("out_of_scope");
        tracing::warn!(reason = %violation, "Assistant SQL outside the caller's scope");
        return Err(ApiError::QueryRejected(format!(
            "The query cannot be run within your access scope: {}",
            violation
        )));
    }

    let mut injection = apply_constraints(sql, constraint);

    let missing = missing_filters(&injection.sql, constraint);
    if !missing.is_empty() {
        record_query_rejection("missing_filter");
        let predicates: Vec<String> = missing.iter().map(|f| f.predicate()).collect();
        tracing::warn!(
            missing = %predicates.join(", "),
            "Assistant SQL could not be constrained"
        );
        return Err(ApiError::QueryRejected(format!(
            "The query could not be restricted to your access scope ({})",
            constraint.description
        )));
    }

    if !injection.injected.is_empty() {
        record_constraint_injection(injection.injected.len());
    }
    if constraint.has_constraints {
        injection.sql = hide_credentials(&injection.sql);
    }
    Ok(injection)
}

/// Database errors from assistant SQL are the statement's fault, not ours.
fn execution_error(err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::Database(db_err) => {
            record_query_rejection("execution_failed");
            ApiError::QueryRejected(format!("The query failed: {}", db_err.message()))
        }
        other => other.into(),
    }
}

/// POST /api/v1/chat/query
pub async fn chat_query(
    State(state): State<AppState>,
    scoped: Scoped,
    Json(request): Json<ChatQueryRequest>,
) -> Result<Json<ChatQueryResponse>, ApiError> {
    let Scoped {
        identity,
        constraint,
    } = scoped;

    if let Some(limiter) = &state.rate_limiter {
        limiter
            .check(identity.id)
            .map_err(|retry_after_secs| ApiError::RateLimited { retry_after_secs })?;
    }

    request.validate()?;
    let input = QueryInput::from_request(&request)?;

    let chats = ChatRepository::new(state.pool.clone());
    if let Some(chat_id) = request.chat_id {
        if chats.find(chat_id, identity.id).await?.is_none() {
            return Err(ApiError::NotFound(format!("Chat {} not found", chat_id)));
        }
    }

    let generated_sql = match input {
        QueryInput::Question(question) => {
            state
                .sql_generator
                .generate_sql(question, &constraint)
                .await?
        }
        QueryInput::Sql(sql) => sql.to_string(),
    };

    let prepared = prepare_statement(&generated_sql, &constraint)?;
    tracing::info!(
        user_id = identity.id,
        injected = prepared.injected.len(),
        scope = %constraint.description,
        "Executing assistant SQL"
    );

    let limits = ExecutionLimits {
        max_rows: state.config.llm.max_rows,
        statement_timeout_ms: state.config.llm.statement_timeout_ms,
    };
    let rows = ChatSqlRepository::new(state.pool.clone(), limits)
        .fetch_json(&prepared.sql)
        .await
        .map_err(execution_error)?;
    let row_count = rows.as_array().map(Vec::len).unwrap_or(0);

    if let Some(chat_id) = request.chat_id {
        let exchange = [
            ChatMessage {
                author: ChatAuthor::User,
                content: input.text().to_string(),
                sql: None,
            },
            ChatMessage {
                author: ChatAuthor::Assistant,
                content: format!("{} row(s)", row_count),
                sql: Some(prepared.sql.clone()),
            },
        ];
        if chats
            .append_messages(chat_id, identity.id, &exchange)
            .await?
            .is_none()
        {
            tracing::warn!(chat_id = %chat_id, "Chat disappeared before the exchange was saved");
        }
    }

    Ok(Json(ChatQueryResponse {
        generated_sql,
        executed_sql: prepared.sql,
        rows,
        row_count,
        scope: constraint.description,
    }))
}
