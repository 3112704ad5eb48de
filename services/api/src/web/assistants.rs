//! services/api/src/web/assistants.rs
//!
//! Handlers for creating, editing, sharing and deleting assistants.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use gptremix_core::assistants::{self, to_context_lines, AssistantExport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::views::{AssistantExportView, AssistantSummaryView, AssistantView, ChatSummaryView};

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ContextMessageInput {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAssistantRequest {
    pub name: String,
    #[serde(default)]
    pub context: Vec<ContextMessageInput>,
}

#[derive(Deserialize, ToSchema)]
pub struct ImportAssistantRequest {
    /// An exported assistant, as a JSON string.
    pub import: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateContextRequest {
    /// Newline-delimited JSON, one `{"role": ..., "content": ...}` object per line.
    pub context: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ForkAssistantRequest {
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct ContextLinesResponse {
    pub context: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's assistants, most recently updated first.
#[utoipa::path(
    get,
    path = "/assistants",
    responses((status = 200, description = "Assistants", body = [AssistantSummaryView]))
)]
pub async fn list_assistants_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<AssistantSummaryView>>, ApiError> {
    let assistants = state.db.list_assistants(user_id).await?;
    Ok(Json(assistants.into_iter().map(Into::into).collect()))
}

/// Create an assistant with an optional ordered context.
#[utoipa::path(
    post,
    path = "/assistants",
    request_body = CreateAssistantRequest,
    responses(
        (status = 201, description = "Assistant created", body = AssistantView),
        (status = 400, description = "Missing name, invalid context or duplicate name")
    )
)]
pub async fn create_assistant_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateAssistantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context: Vec<(&str, &str)> = req
        .context
        .iter()
        .map(|m| (m.role.as_str(), m.content.as_str()))
        .collect();
    let assistant =
        assistants::create_assistant_from_input(state.db.as_ref(), user_id, &req.name, &context)
            .await?;
    info!("User {} created assistant {}", user_id, assistant.id);

    Ok((StatusCode::CREATED, Json(AssistantView::new(&assistant, Vec::new()))))
}

/// Create an assistant from an exported JSON document.
#[utoipa::path(
    post,
    path = "/assistants/import",
    request_body = ImportAssistantRequest,
    responses(
        (status = 201, description = "Assistant imported", body = AssistantView),
        (status = 400, description = "Invalid import document or duplicate name")
    )
)]
pub async fn import_assistant_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ImportAssistantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let assistant = assistants::import_assistant(state.db.as_ref(), user_id, &req.import).await?;
    info!("User {} imported assistant {}", user_id, assistant.id);

    Ok((StatusCode::CREATED, Json(AssistantView::new(&assistant, Vec::new()))))
}

/// Fetch one assistant with its context and chats.
#[utoipa::path(
    get,
    path = "/assistants/{id}",
    params(("id" = Uuid, Path, description = "Assistant id")),
    responses(
        (status = 200, description = "Assistant", body = AssistantView),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn get_assistant_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssistantView>, ApiError> {
    let assistant = state.db.get_assistant(user_id, id).await?;
    let chats = state.db.list_chats_for_assistant(user_id, id).await?;
    Ok(Json(AssistantView::new(&assistant, chats)))
}

/// Delete an assistant together with its context and chats.
#[utoipa::path(
    delete,
    path = "/assistants/{id}",
    params(("id" = Uuid, Path, description = "Assistant id")),
    responses(
        (status = 204, description = "Assistant deleted"),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn delete_assistant_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_assistant(user_id, id).await?;
    info!("User {} deleted assistant {}", user_id, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the assistant's context from newline-delimited JSON.
#[utoipa::path(
    put,
    path = "/assistants/{id}/context",
    params(("id" = Uuid, Path, description = "Assistant id")),
    request_body = UpdateContextRequest,
    responses(
        (status = 200, description = "Context replaced", body = AssistantView),
        (status = 400, description = "One or more lines are invalid"),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn update_context_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContextRequest>,
) -> Result<Json<AssistantView>, ApiError> {
    let assistant = assistants::update_context(state.db.as_ref(), user_id, id, &req.context).await?;
    let chats = state.db.list_chats_for_assistant(user_id, id).await?;
    Ok(Json(AssistantView::new(&assistant, chats)))
}

/// The current context in the editable newline-delimited JSON form.
#[utoipa::path(
    get,
    path = "/assistants/{id}/context/lines",
    params(("id" = Uuid, Path, description = "Assistant id")),
    responses(
        (status = 200, description = "Editable context", body = ContextLinesResponse),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn context_lines_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContextLinesResponse>, ApiError> {
    let assistant = state.db.get_assistant(user_id, id).await?;
    Ok(Json(ContextLinesResponse {
        context: to_context_lines(&assistant.context_messages),
    }))
}

/// Export the assistant as a portable JSON document.
#[utoipa::path(
    get,
    path = "/assistants/{id}/export",
    params(("id" = Uuid, Path, description = "Assistant id")),
    responses(
        (status = 200, description = "Export document", body = AssistantExportView),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn export_assistant_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssistantExportView>, ApiError> {
    let assistant = state.db.get_assistant(user_id, id).await?;
    Ok(Json(AssistantExport::from(&assistant).into()))
}

/// Copy the assistant's context into a new assistant.
#[utoipa::path(
    post,
    path = "/assistants/{id}/fork",
    params(("id" = Uuid, Path, description = "Assistant id")),
    request_body = ForkAssistantRequest,
    responses(
        (status = 201, description = "Forked assistant", body = AssistantView),
        (status = 400, description = "Missing or duplicate name"),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn fork_assistant_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<ForkAssistantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fork = assistants::fork_assistant(state.db.as_ref(), user_id, id, &req.name).await?;
    info!("User {} forked assistant {} into {}", user_id, id, fork.id);
    Ok((StatusCode::CREATED, Json(AssistantView::new(&fork, Vec::new()))))
}

/// List the chats held with one assistant.
#[utoipa::path(
    get,
    path = "/assistants/{id}/chats",
    params(("id" = Uuid, Path, description = "Assistant id")),
    responses(
        (status = 200, description = "Chats", body = [ChatSummaryView]),
        (status = 404, description = "Assistant not found")
    )
)]
pub async fn assistant_chats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatSummaryView>>, ApiError> {
    // Resolving the assistant first turns a foreign id into a 404 rather than an empty list.
    state.db.get_assistant(user_id, id).await?;
    let chats = state.db.list_chats_for_assistant(user_id, id).await?;
    Ok(Json(chats.into_iter().map(Into::into).collect()))
}
