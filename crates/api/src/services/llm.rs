//! Natural-language to SQL generation.
//!
//! The generator only proposes SQL. Constraint injection and the read-only
//! checks happen in the chat query handler, whatever the model returns.

use async_trait::async_trait;
use domain::services::AccessConstraint;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmConfig;

/// Errors from SQL generation.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("SQL assistant is disabled")]
    Disabled,

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Assistant service error: {0}")]
    ServiceError(String),

    #[error("Invalid response from assistant service: {0}")]
    InvalidResponse(String),

    #[error("Assistant response contained no SQL")]
    NoSql,
}

/// Turns a question into a candidate SQL statement.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(
        &self,
        question: &str,
        constraint: &AccessConstraint,
    ) -> Result<String, LlmError>;
}

/// Generator used when no LLM is configured.
#[derive(Debug, Default)]
pub struct DisabledSqlGenerator;

#[async_trait]
impl SqlGenerator for DisabledSqlGenerator {
    async fn generate_sql(&self, _: &str, _: &AccessConstraint) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

const SCHEMA_DESCRIPTION: &str = "\
dioceses(id, name, address, contact_email, created_at, updated_at)
testing_centers(id, diocese_id, name, address, active, created_at, updated_at)
users(id, email, username, role, diocese_id, testing_center_id, created_at)
students(id, diocese_id, testing_center_id, first_name, last_name, grade, created_at)
test_results(id, student_id, diocese_id, testing_center_id, score, taken_at)";

/// Builds the system prompt for a caller's scope.
pub fn system_prompt(constraint: &AccessConstraint) -> String {
    let mut prompt = format!(
        "You write a single read-only PostgreSQL SELECT statement answering the user's question.\n\
         Reply with the SQL only.\n\nTables:\n{}\n",
        SCHEMA_DESCRIPTION
    );

    let filters = constraint.filters();
    if !filters.is_empty() {
        let predicates: Vec<String> = filters.iter().map(|f| f.predicate()).collect();
        prompt.push_str(&format!(
            "\nThe user is {}. Every query on a table with these columns must filter on: {}.\n\
             Use only the tables above, with explicit JOINs and no subqueries, CTEs or UNIONs.\n",
            constraint.description,
            predicates.join(" AND ")
        ));
    }
    prompt
}

lazy_static! {
    static ref FENCED_SQL_RE: Regex = Regex::new(r"(?is)```(?:sql)?\s*(.*?)```").unwrap();
}

/// Pulls the SQL statement out of a model reply, with or without a
/// fenced code block.
pub fn extract_sql(content: &str) -> Option<String> {
    let raw = match FENCED_SQL_RE.captures(content) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
        None => content,
    };
    let sql = raw.trim();
    if sql.is_empty() {
        None
    } else {
        Some(sql.to_string())
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [CompletionMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionContent,
}

#[derive(Debug, Deserialize)]
struct CompletionContent {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiSqlGenerator {
    client: Client,
    config: LlmConfig,
}

impl OpenAiSqlGenerator {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;
        Ok(Self { client, config })
    }
}

impl std::fmt::Debug for OpenAiSqlGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSqlGenerator")
            .field("api_url", &self.config.api_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[async_trait]
impl SqlGenerator for OpenAiSqlGenerator {
    async fn generate_sql(
        &self,
        question: &str,
        constraint: &AccessConstraint,
    ) -> Result<String, LlmError> {
        let prompt = system_prompt(constraint);
        let request = CompletionRequest {
            model: &self.config.model,
            temperature: 0.0,
            messages: [
                CompletionMessage {
                    role: "system",
                    content: &prompt,
                },
                CompletionMessage {
                    role: "user",
                    content: question,
                },
            ],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_ms)
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Assistant service returned an error");
            return Err(LlmError::ServiceError(format!("HTTP {}: {}", status, body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices".to_string()))?;

        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Assistant produced SQL"
        );
        extract_sql(&content).ok_or(LlmError::NoSql)
    }
}
