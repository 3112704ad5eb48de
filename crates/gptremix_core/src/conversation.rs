//! crates/gptremix_core/src/conversation.rs
//!
//! Assembles completion requests for a chat turn and records the exchange.

use crate::domain::{ContextMessage, Message, MessageRole, NewMessage, PromptMessage, Role};
use crate::ports::{ChatCompletionService, DatabaseService, PortError};
use crate::validation::{FieldErrors, ServiceError, ServiceResult};
use uuid::Uuid;

/// The two messages persisted by a successful turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub user_message: Message,
    pub assistant_message: Message,
}

/// Usage counts saturate at the column's `INTEGER` range.
fn stored_token_count(tokens: u32) -> i32 {
    i32::try_from(tokens).unwrap_or(i32::MAX)
}

/// Builds the prompt: assistant context, then chat history, then the new input.
pub fn assemble_prompt(
    context: &[ContextMessage],
    history: &[Message],
    user_input: &str,
) -> Vec<PromptMessage> {
    let mut prompt = Vec::with_capacity(context.len() + history.len() + 1);
    prompt.extend(context.iter().map(|m| PromptMessage {
        role: m.role,
        content: m.content.clone(),
    }));
    prompt.extend(history.iter().map(|m| PromptMessage {
        role: m.role.into(),
        content: m.content.clone(),
    }));
    prompt.push(PromptMessage {
        role: Role::User,
        content: user_input.to_string(),
    });
    prompt
}

/// Runs one chat turn for `user_id`.
///
/// The completion API is called exactly once. Messages are written only after
/// it returned content: first the user's input, then the reply. The two writes
/// are independent, so a failure on the second leaves the first in place.
pub async fn send_message(
    db: &dyn DatabaseService,
    completions: &dyn ChatCompletionService,
    user_id: Uuid,
    chat_id: Uuid,
    user_input: &str,
) -> ServiceResult<ChatTurn> {
    if user_input.trim().is_empty() {
        return Err(ServiceError::Validation(FieldErrors::single(
            "user_input",
            "User input message is required",
        )));
    }

    let user = db.get_user(user_id).await?;
    let api_key = user
        .settings
        .api_key
        .filter(|k| !k.is_empty())
        .ok_or(ServiceError::MissingApiKey)?;

    let chat = db.get_chat(user_id, chat_id).await?;
    let assistant = db.get_assistant(user_id, chat.assistant_id).await?;

    let prompt = assemble_prompt(&assistant.context_messages, &chat.messages, user_input);
    let completion = completions.complete(&api_key, &prompt).await?;
    if completion.content.is_empty() {
        let err = PortError::Unexpected("Completion response contained no content".to_string());
        return Err(err.into());
    }

    let user_message = db
        .add_message(
            user_id,
            chat.id,
            NewMessage {
                role: MessageRole::User,
                content: user_input.to_string(),
                token_count: stored_token_count(completion.prompt_tokens),
            },
        )
        .await?;

    let assistant_message = db
        .add_message(
            user_id,
            chat.id,
            NewMessage {
                role: MessageRole::Assistant,
                content: completion.content,
                token_count: stored_token_count(completion.completion_tokens),
            },
        )
        .await?;

    Ok(ChatTurn {
        user_message,
        assistant_message,
    })
}
