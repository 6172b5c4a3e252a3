//! Chat assistant domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatAuthor {
    User,
    Assistant,
}

/// One message in a saved chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub author: ChatAuthor,
    pub content: String,
    /// SQL the assistant ran to answer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// A saved chat conversation, owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub user_id: i32,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a chat.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Request to replace a chat's title and messages.
///
/// `expectedUpdatedAt` must match the stored value; a mismatch means another
/// writer saved first and the update is rejected.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub expected_updated_at: DateTime<Utc>,
}

/// Summary row for chat listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: Uuid,
    pub title: String,
    pub message_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// A question for the SQL assistant, or SQL to run directly.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatQueryRequest {
    #[validate(custom(function = "shared::validation::validate_question"))]
    pub question: Option<String>,
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub sql: Option<String>,
    /// Chat to append the exchange to.
    pub chat_id: Option<Uuid>,
}

/// Answer from the SQL assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQueryResponse {
    /// SQL as produced by the generator (or supplied by the caller).
    pub generated_sql: String,
    /// SQL actually executed, after constraint injection.
    pub executed_sql: String,
    pub rows: serde_json::Value,
    pub row_count: usize,
    pub scope: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_serde() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"author": "assistant", "content": "42 students"}"#).unwrap();
        assert_eq!(msg.author, ChatAuthor::Assistant);
        assert!(msg.sql.is_none());

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("sql").is_none());
    }

    #[test]
    fn test_chat_query_request_validation() {
        let req: ChatQueryRequest =
            serde_json::from_str(r#"{"question": "How many students?"}"#).unwrap();
        assert!(req.validate().is_ok());

        let blank: ChatQueryRequest = serde_json::from_str(r#"{"sql": "   "}"#).unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_create_chat_defaults_messages() {
        let req: CreateChatRequest = serde_json::from_str(r#"{"title": "Enrollment"}"#).unwrap();
        assert!(req.messages.is_empty());
        assert!(req.validate().is_ok());
    }
}
