pub mod assistants;
pub mod conversation;
pub mod domain;
pub mod ports;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use domain::{
    Assistant, AssistantSummary, Chat, ChatSummary, Completion, ContextMessage,
    Message, MessageRole, NewContextMessage, NewMessage, PromptMessage, Role, User,
    UserCredentials, UserSettings,
};
pub use ports::{ChatCompletionService, DatabaseService, PortError, PortResult};
pub use validation::{FieldErrors, ServiceError, ServiceResult};
