//! services/api/src/web/views.rs
//!
//! JSON response payloads shared by the assistant and chat endpoints.

use chrono::{DateTime, Utc};
use gptremix_core::assistants::{AssistantExport, ExportedMessage};
use gptremix_core::conversation::ChatTurn;
use gptremix_core::domain::{Assistant, AssistantSummary, ChatSummary, ContextMessage, Message};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
pub struct AssistantSummaryView {
    pub id: Uuid,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<AssistantSummary> for AssistantSummaryView {
    fn from(s: AssistantSummary) -> Self {
        Self {
            id: s.id,
            name: s.name,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ContextMessageView {
    pub id: Uuid,
    pub position: i32,
    /// One of `system`, `user`, `assistant`.
    pub role: String,
    pub content: String,
}

impl From<&ContextMessage> for ContextMessageView {
    fn from(m: &ContextMessage) -> Self {
        Self {
            id: m.id,
            position: m.position,
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChatSummaryView {
    pub id: Uuid,
    pub assistant_id: Uuid,
    pub assistant_name: String,
    pub message_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatSummary> for ChatSummaryView {
    fn from(s: ChatSummary) -> Self {
        Self {
            id: s.id,
            assistant_id: s.assistant_id,
            assistant_name: s.assistant_name,
            message_count: s.message_count,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AssistantView {
    pub id: Uuid,
    pub name: String,
    pub context_messages: Vec<ContextMessageView>,
    pub chats: Vec<ChatSummaryView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssistantView {
    pub fn new(assistant: &Assistant, chats: Vec<ChatSummary>) -> Self {
        Self {
            id: assistant.id,
            name: assistant.name.clone(),
            context_messages: assistant.context_messages.iter().map(Into::into).collect(),
            chats: chats.into_iter().map(Into::into).collect(),
            created_at: assistant.created_at,
            updated_at: assistant.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageView {
    pub id: Uuid,
    /// Either `user` or `assistant`.
    pub role: String,
    pub content: String,
    pub token_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
            token_count: m.token_count,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChatView {
    pub id: Uuid,
    pub assistant_id: Uuid,
    pub assistant_name: String,
    /// The assistant's context, shown above the conversation.
    pub context_messages: Vec<ContextMessageView>,
    pub messages: Vec<MessageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatTurnView {
    pub user_message: MessageView,
    pub assistant_message: MessageView,
}

impl From<&ChatTurn> for ChatTurnView {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            user_message: (&turn.user_message).into(),
            assistant_message: (&turn.assistant_message).into(),
        }
    }
}

/// The portable export document: `{"name": ..., "messages": [{role, content}]}`.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AssistantExportView {
    pub name: String,
    pub messages: Vec<ExportedMessageView>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ExportedMessageView {
    pub role: String,
    pub content: String,
}

impl From<AssistantExport> for AssistantExportView {
    fn from(export: AssistantExport) -> Self {
        Self {
            name: export.name,
            messages: export
                .messages
                .into_iter()
                .map(|ExportedMessage { role, content }| ExportedMessageView { role, content })
                .collect(),
        }
    }
}
