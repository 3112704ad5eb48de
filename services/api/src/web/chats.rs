//! services/api/src/web/chats.rs
//!
//! Handlers for chats and chat turns.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use gptremix_core::conversation;
use gptremix_core::domain::{Assistant, Chat};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::views::{ChatSummaryView, ChatTurnView, ChatView};

#[derive(Deserialize, ToSchema)]
pub struct CreateChatRequest {
    pub assistant_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub user_input: String,
}

fn chat_view(chat: &Chat, assistant: &Assistant) -> ChatView {
    ChatView {
        id: chat.id,
        assistant_id: assistant.id,
        assistant_name: assistant.name.clone(),
        context_messages: assistant.context_messages.iter().map(Into::into).collect(),
        messages: chat.messages.iter().map(Into::into).collect(),
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    }
}

/// List the caller's chats, most recently active first.
#[utoipa::path(
    get,
    path = "/chats",
    responses((status = 200, description = "Chats", body = [ChatSummaryView]))
)]
pub async fn list_chats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<ChatSummaryView>>, ApiError> {
    let chats = state.db.list_chats(user_id).await?;
    Ok(Json(chats.into_iter().map(Into::into).collect()))
}

/// Start a new chat with one of the caller's assistants.
#[utoipa::path(
    post,
    path = "/chats",
    request_body = CreateChatRequest,
    responses(
        (status = 201, description = "Chat created", body = ChatView),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn create_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let assistant = state.db.get_assistant(user_id, req.assistant_id).await?;
    let chat = state.db.create_chat(user_id, assistant.id).await?;
    info!("User {} started chat {} with assistant {}", user_id, chat.id, assistant.id);
    Ok((StatusCode::CREATED, Json(chat_view(&chat, &assistant))))
}

/// Fetch a chat with its full history and its assistant's context.
#[utoipa::path(
    get,
    path = "/chats/{id}",
    params(("id" = Uuid, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Chat", body = ChatView),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn get_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatView>, ApiError> {
    let chat = state.db.get_chat(user_id, id).await?;
    let assistant = state.db.get_assistant(user_id, chat.assistant_id).await?;
    Ok(Json(chat_view(&chat, &assistant)))
}

/// Delete a chat and all of its messages.
#[utoipa::path(
    delete,
    path = "/chats/{id}",
    params(("id" = Uuid, Path, description = "Chat id")),
    responses(
        (status = 204, description = "Chat deleted"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn delete_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_chat(user_id, id).await?;
    info!("User {} deleted chat {}", user_id, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Send one user turn and return the stored user and assistant messages.
#[utoipa::path(
    post,
    path = "/chats/{id}/messages",
    params(("id" = Uuid, Path, description = "Chat id")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Turn completed", body = ChatTurnView),
        (status = 400, description = "Empty input or no API key configured"),
        (status = 404, description = "Chat not found"),
        (status = 500, description = "Completion API failure")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let turn = conversation::send_message(
        state.db.as_ref(),
        state.completions.as_ref(),
        user_id,
        id,
        &req.user_input,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ChatTurnView::from(&turn))))
}
