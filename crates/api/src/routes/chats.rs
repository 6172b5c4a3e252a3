//! Saved chat endpoints. Every chat is visible to its owner only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{Chat, ChatSummary, CreateChatRequest, UpdateChatRequest};
use persistence::repositories::{ChatRepository, ChatUpdate};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Chat {} not found", id))
}

/// GET /api/v1/chats
pub async fn list_chats(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    let chats = ChatRepository::new(state.pool.clone())
        .list_for_user(identity.id)
        .await?;
    Ok(Json(chats))
}

/// POST /api/v1/chats
pub async fn create_chat(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<Chat>), ApiError> {
    request.validate()?;
    let chat = ChatRepository::new(state.pool.clone())
        .create(identity.id, &request.title, &request.messages)
        .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

/// GET /api/v1/chats/:id
pub async fn get_chat(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Chat>, ApiError> {
    ChatRepository::new(state.pool.clone())
        .find(id, identity.id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PUT /api/v1/chats/:id
///
/// The client sends the `updatedAt` it last saw; a newer stored version
/// answers 409 and the client must reload before saving again.
pub async fn update_chat(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateChatRequest>,
) -> Result<Json<Chat>, ApiError> {
    request.validate()?;

    let outcome = ChatRepository::new(state.pool.clone())
        .update(
            id,
            identity.id,
            request.title.as_deref(),
            &request.messages,
            request.expected_updated_at,
        )
        .await?;

    match outcome {
        ChatUpdate::Updated(chat) => Ok(Json(chat)),
        ChatUpdate::Conflict { current_updated_at } => {
            tracing::debug!(chat_id = %id, "Stale chat update rejected");
            Err(ApiError::Conflict(format!(
                "Chat was modified at {}; reload before saving",
                current_updated_at.to_rfc3339()
            )))
        }
        ChatUpdate::NotFound => Err(not_found(id)),
    }
}

/// DELETE /api/v1/chats/:id
pub async fn delete_chat(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if ChatRepository::new(state.pool.clone())
        .delete(id, identity.id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
