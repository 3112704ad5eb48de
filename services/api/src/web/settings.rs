//! services/api/src/web/settings.rs
//!
//! Per-user settings: the completion-API key.

use axum::{extract::State, http::StatusCode, Extension, Json};
use gptremix_core::FieldErrors;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

const PREVIEW_CHARS: usize = 10;

#[derive(Deserialize, ToSchema)]
pub struct UpdateApiKeyRequest {
    pub api_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct ApiKeyResponse {
    /// The first characters of the stored key, or null when none is set.
    pub api_key_preview: Option<String>,
}

fn preview(key: &str) -> String {
    key.chars().take(PREVIEW_CHARS).collect()
}

/// Show which completion-API key is configured.
#[utoipa::path(
    get,
    path = "/settings/api-key",
    responses((status = 200, description = "Key preview", body = ApiKeyResponse))
)]
pub async fn get_api_key_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let user = state.db.get_user(user_id).await?;
    Ok(Json(ApiKeyResponse {
        api_key_preview: user.settings.api_key.as_deref().map(preview),
    }))
}

/// Store the completion-API key used for this user's chats.
#[utoipa::path(
    put,
    path = "/settings/api-key",
    request_body = UpdateApiKeyRequest,
    responses(
        (status = 204, description = "Key stored"),
        (status = 400, description = "API key is required")
    )
)]
pub async fn update_api_key_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UpdateApiKeyRequest>,
) -> Result<StatusCode, ApiError> {
    let api_key = req.api_key.trim();
    if api_key.is_empty() {
        return Err(ApiError::Validation(FieldErrors::single("api_key", "API Key is required")));
    }

    state.db.update_user_api_key(user_id, api_key).await?;
    info!("User {} updated their API key", user_id);
    Ok(StatusCode::NO_CONTENT)
}
