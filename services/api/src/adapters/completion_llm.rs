//! services/api/src/adapters/completion_llm.rs
//!
//! This module contains the adapter for the chat-completion LLM.
//! It implements the `ChatCompletionService` port from the `core` crate.
//!
//! Every user brings their own API key, so a client is configured per request
//! from the caller's key and the shared model / base URL settings.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use gptremix_core::{
    domain::{Completion, PromptMessage, Role},
    ports::{ChatCompletionService, PortError, PortResult},
};
use tracing::{error, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` using an OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    model: String,
    api_base: Option<String>,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(model: String, api_base: Option<String>) -> Self {
        Self { model, api_base }
    }

    fn client_for(&self, api_key: &str) -> Client<OpenAIConfig> {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &self.api_base {
            config = config.with_api_base(base);
        }
        Client::with_config(config)
    }
}

fn to_request_message(message: &PromptMessage) -> PortResult<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
    };
    Ok(built)
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for OpenAiChatAdapter {
    /// Sends the assembled prompt once and returns the first choice's content.
    async fn complete(&self, api_key: &str, messages: &[PromptMessage]) -> PortResult<Completion> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<PortResult<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!("Requesting completion from {} with {} messages", self.model, messages.len());

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client_for(api_key)
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| {
                error!("Completion request failed: {}", e);
                PortError::Unexpected(e.to_string())
            })?;

        let (prompt_tokens, completion_tokens) = response
            .usage
            .as_ref()
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                PortError::Unexpected("Completion response contained no content.".to_string())
            })?;

        Ok(Completion {
            content,
            prompt_tokens,
            completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_converts_to_a_request_message() {
        let prompt = [
            PromptMessage { role: Role::System, content: "Be terse".into() },
            PromptMessage { role: Role::User, content: "Hi".into() },
            PromptMessage { role: Role::Assistant, content: "Hello".into() },
        ];
        let converted: Vec<_> = prompt.iter().map(|m| to_request_message(m).unwrap()).collect();
        assert!(matches!(converted[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(converted[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(converted[2], ChatCompletionRequestMessage::Assistant(_)));
    }
}
