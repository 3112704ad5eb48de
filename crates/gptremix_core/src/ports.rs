//! crates/gptremix_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database and completion API.

use crate::domain::{
    Assistant, AssistantSummary, Chat, ChatSummary, Completion, Message, NewContextMessage,
    NewMessage, PromptMessage, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence accessors.
///
/// Every entity lookup takes the owning user's id and only returns rows that
/// belong to that user. Foreign or missing rows both surface as
/// [`PortError::NotFound`].
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn update_user_api_key(&self, user_id: Uuid, api_key: &str) -> PortResult<()>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user id of an unexpired session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Assistants ---
    async fn list_assistants(&self, user_id: Uuid) -> PortResult<Vec<AssistantSummary>>;

    async fn get_assistant(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<Assistant>;

    /// Fails with [`PortError::Conflict`] if the user already has an assistant with this name.
    async fn create_assistant(
        &self,
        user_id: Uuid,
        name: &str,
        context: &[NewContextMessage],
    ) -> PortResult<Assistant>;

    async fn replace_context_messages(
        &self,
        user_id: Uuid,
        assistant_id: Uuid,
        context: &[NewContextMessage],
    ) -> PortResult<Assistant>;

    /// Removes the assistant together with its context messages and chats.
    async fn delete_assistant(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<()>;

    // --- Chats ---
    async fn list_chats(&self, user_id: Uuid) -> PortResult<Vec<ChatSummary>>;

    async fn list_chats_for_assistant(
        &self,
        user_id: Uuid,
        assistant_id: Uuid,
    ) -> PortResult<Vec<ChatSummary>>;

    async fn get_chat(&self, user_id: Uuid, chat_id: Uuid) -> PortResult<Chat>;

    async fn create_chat(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<Chat>;

    /// Removes the chat together with its messages.
    async fn delete_chat(&self, user_id: Uuid, chat_id: Uuid) -> PortResult<()>;

    async fn add_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message: NewMessage,
    ) -> PortResult<Message>;
}

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Sends the prompt once, authenticated with the caller's own API key,
    /// and returns the first choice.
    async fn complete(&self, api_key: &str, messages: &[PromptMessage])
        -> PortResult<Completion>;
}
