//! services/api/src/web/rest.rs
//!
//! Builds the REST router and holds the master definition for the OpenAPI
//! specification.

use crate::{
    config::ConfigError,
    error::ApiError,
    web::{assistants, auth, chats, middleware::require_auth, settings, state::AppState, views},
};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        settings::get_api_key_handler,
        settings::update_api_key_handler,
        assistants::list_assistants_handler,
        assistants::create_assistant_handler,
        assistants::import_assistant_handler,
        assistants::get_assistant_handler,
        assistants::delete_assistant_handler,
        assistants::update_context_handler,
        assistants::context_lines_handler,
        assistants::export_assistant_handler,
        assistants::fork_assistant_handler,
        assistants::assistant_chats_handler,
        chats::list_chats_handler,
        chats::create_chat_handler,
        chats::get_chat_handler,
        chats::delete_chat_handler,
        chats::send_message_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            settings::UpdateApiKeyRequest,
            settings::ApiKeyResponse,
            assistants::ContextMessageInput,
            assistants::CreateAssistantRequest,
            assistants::ImportAssistantRequest,
            assistants::UpdateContextRequest,
            assistants::ForkAssistantRequest,
            assistants::ContextLinesResponse,
            chats::CreateChatRequest,
            chats::SendMessageRequest,
            views::AssistantSummaryView,
            views::AssistantView,
            views::ContextMessageView,
            views::ChatSummaryView,
            views::ChatView,
            views::MessageView,
            views::ChatTurnView,
            views::AssistantExportView,
            views::ExportedMessageView,
        )
    ),
    tags(
        (name = "GPTremix API", description = "Assistants with seed context and threaded chats against a completion API.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Assembles the public and cookie-protected routes around the shared state.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/settings/api-key",
            get(settings::get_api_key_handler).put(settings::update_api_key_handler),
        )
        .route(
            "/assistants",
            get(assistants::list_assistants_handler).post(assistants::create_assistant_handler),
        )
        .route("/assistants/import", post(assistants::import_assistant_handler))
        .route(
            "/assistants/{id}",
            get(assistants::get_assistant_handler).delete(assistants::delete_assistant_handler),
        )
        .route("/assistants/{id}/context", put(assistants::update_context_handler))
        .route("/assistants/{id}/context/lines", get(assistants::context_lines_handler))
        .route("/assistants/{id}/export", get(assistants::export_assistant_handler))
        .route("/assistants/{id}/fork", post(assistants::fork_assistant_handler))
        .route("/assistants/{id}/chats", get(assistants::assistant_chats_handler))
        .route("/chats", get(chats::list_chats_handler).post(chats::create_chat_handler))
        .route(
            "/chats/{id}",
            get(chats::get_chat_handler).delete(chats::delete_chat_handler),
        )
        .route("/chats/{id}/messages", post(chats::send_message_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
