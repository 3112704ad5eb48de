//! crates/gptremix_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Roles
//=========================================================================================

/// The role of any entry in a completion prompt.
///
/// Assistant context messages may use all three; persisted chat messages are
/// restricted to [`MessageRole`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The author of a persisted chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Role::User,
            MessageRole::Assistant => Role::Assistant,
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

//=========================================================================================
// Users and Auth
//=========================================================================================

/// Per-user settings. Currently only the completion-API key.
#[derive(Clone, Default)]
pub struct UserSettings {
    pub api_key: Option<String>,
}

// Keeps the key out of logs.
impl fmt::Debug for UserSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub settings: UserSettings,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Assistants
//=========================================================================================

/// One seed message prepended to every completion request for an assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMessage {
    pub id: Uuid,
    pub position: i32,
    pub role: Role,
    pub content: String,
}

/// A context message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContextMessage {
    pub role: Role,
    pub content: String,
}

impl From<&ContextMessage> for NewContextMessage {
    fn from(message: &ContextMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// A named, reusable persona together with its ordered context.
#[derive(Debug, Clone)]
pub struct Assistant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub context_messages: Vec<ContextMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for an assistant.
#[derive(Debug, Clone)]
pub struct AssistantSummary {
    pub id: Uuid,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

//=========================================================================================
// Chats and Messages
//=========================================================================================

/// A persisted, immutable message within a chat.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub token_count: i32,
    pub created_at: DateTime<Utc>,
}

/// A message that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub token_count: i32,
}

/// A conversation thread with its full, ordered history.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assistant_id: Uuid,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for a chat.
#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub id: Uuid,
    pub assistant_id: Uuid,
    pub assistant_name: String,
    pub message_count: i64,
    pub updated_at: DateTime<Utc>,
}

//=========================================================================================
// Completion Prompt
//=========================================================================================

/// A single entry of the prompt sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// The first choice returned by the completion API plus its token usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_from_their_wire_names() {
        assert_eq!("system".parse::<Role>(), Ok(Role::System));
        assert_eq!("assistant".parse::<Role>(), Ok(Role::Assistant));
        assert!("System".parse::<Role>().is_err());
        assert!("system".parse::<MessageRole>().is_err());
        assert_eq!(Role::from(MessageRole::User), Role::User);
    }

    #[test]
    fn settings_debug_hides_the_api_key() {
        let settings = UserSettings {
            api_key: Some("sk-very-secret".to_string()),
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("redacted"));
    }
}
