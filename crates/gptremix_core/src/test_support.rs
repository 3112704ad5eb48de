//! In-memory port implementations used by the core tests.
//!
//! `MemoryDb` applies the same ownership predicates, per-user name uniqueness
//! and cascades as the PostgreSQL schema.

use crate::domain::*;
use crate::ports::{ChatCompletionService, DatabaseService, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    clock: i64,
    users: Vec<(User, String)>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    assistants: Vec<Assistant>,
    chats: Vec<Chat>,
}

impl State {
    /// Strictly increasing timestamps.
    fn now(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::microseconds(self.clock)
    }

    fn assistant(&self, user_id: Uuid, id: Uuid) -> PortResult<&Assistant> {
        self.assistants
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Assistant {} not found", id)))
    }

    fn summarize(&self, chat: &Chat) -> ChatSummary {
        let assistant_name = self
            .assistants
            .iter()
            .find(|a| a.id == chat.assistant_id)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        ChatSummary {
            id: chat.id,
            assistant_id: chat.assistant_id,
            assistant_name,
            message_count: chat.messages.len() as i64,
            updated_at: chat.updated_at,
        }
    }
}

fn to_context(messages: &[NewContextMessage]) -> Vec<ContextMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| ContextMessage {
            id: Uuid::new_v4(),
            position: i as i32,
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}

#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
}

impl MemoryDb {
    pub fn add_user(&self, email: &str) -> Uuid {
        let mut state = self.state.lock().unwrap();
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            settings: UserSettings::default(),
        };
        let id = user.user_id;
        state.users.push((user, "hash".to_string()));
        id
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|(u, _)| u.email == email) {
            return Err(PortError::Conflict(format!("email {} already registered", email)));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            settings: UserSettings::default(),
        };
        state.users.push((user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user_id: u.user_id,
                email: u.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|(u, _)| u.user_id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_user_api_key(&self, user_id: Uuid, api_key: &str) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let (user, _) = state
            .users
            .iter_mut()
            .find(|(u, _)| u.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.settings.api_key = Some(api_key.to_string());
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let state = self.state.lock().unwrap();
        match state.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::NotFound("Auth session not found".to_string())),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn list_assistants(&self, user_id: Uuid) -> PortResult<Vec<AssistantSummary>> {
        let state = self.state.lock().unwrap();
        let mut summaries: Vec<_> = state
            .assistants
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| AssistantSummary {
                id: a.id,
                name: a.name.clone(),
                updated_at: a.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn get_assistant(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<Assistant> {
        let state = self.state.lock().unwrap();
        state.assistant(user_id, assistant_id).cloned()
    }

    async fn create_assistant(
        &self,
        user_id: Uuid,
        name: &str,
        context: &[NewContextMessage],
    ) -> PortResult<Assistant> {
        let mut state = self.state.lock().unwrap();
        if state.assistants.iter().any(|a| a.user_id == user_id && a.name == name) {
            return Err(PortError::Conflict(format!("assistant name {} already used", name)));
        }
        let now = state.now();
        let assistant = Assistant {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            context_messages: to_context(context),
            created_at: now,
            updated_at: now,
        };
        state.assistants.push(assistant.clone());
        Ok(assistant)
    }

    async fn replace_context_messages(
        &self,
        user_id: Uuid,
        assistant_id: Uuid,
        context: &[NewContextMessage],
    ) -> PortResult<Assistant> {
        let mut state = self.state.lock().unwrap();
        state.assistant(user_id, assistant_id)?;
        let now = state.now();
        let assistant = state
            .assistants
            .iter_mut()
            .find(|a| a.id == assistant_id)
            .ok_or_else(|| PortError::NotFound(format!("Assistant {} not found", assistant_id)))?;
        assistant.context_messages = to_context(context);
        assistant.updated_at = now;
        Ok(assistant.clone())
    }

    async fn delete_assistant(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        state.assistant(user_id, assistant_id)?;
        state.assistants.retain(|a| a.id != assistant_id);
        state.chats.retain(|c| c.assistant_id != assistant_id);
        Ok(())
    }

    async fn list_chats(&self, user_id: Uuid) -> PortResult<Vec<ChatSummary>> {
        let state = self.state.lock().unwrap();
        let mut summaries: Vec<_> = state
            .chats
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| state.summarize(c))
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn list_chats_for_assistant(
        &self,
        user_id: Uuid,
        assistant_id: Uuid,
    ) -> PortResult<Vec<ChatSummary>> {
        let chats = self.list_chats(user_id).await?;
        Ok(chats.into_iter().filter(|c| c.assistant_id == assistant_id).collect())
    }

    async fn get_chat(&self, user_id: Uuid, chat_id: Uuid) -> PortResult<Chat> {
        let state = self.state.lock().unwrap();
        state
            .chats
            .iter()
            .find(|c| c.id == chat_id && c.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Chat {} not found", chat_id)))
    }

    async fn create_chat(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<Chat> {
        let mut state = self.state.lock().unwrap();
        state.assistant(user_id, assistant_id)?;
        let now = state.now();
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id,
            assistant_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.chats.push(chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, user_id: Uuid, chat_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.chats.len();
        state.chats.retain(|c| !(c.id == chat_id && c.user_id == user_id));
        if state.chats.len() == before {
            return Err(PortError::NotFound(format!("Chat {} not found", chat_id)));
        }
        Ok(())
    }

    async fn add_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message: NewMessage,
    ) -> PortResult<Message> {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let chat = state
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id && c.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Chat {} not found", chat_id)))?;
        let stored = Message {
            id: Uuid::new_v4(),
            chat_id,
            role: message.role,
            content: message.content,
            token_count: message.token_count,
            created_at: now,
        };
        chat.messages.push(stored.clone());
        chat.updated_at = now;
        Ok(stored)
    }
}

/// A completion fake that pops canned replies and records every request.
pub struct ScriptedCompletions {
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    requests: Mutex<Vec<(String, Vec<PromptMessage>)>>,
}

impl ScriptedCompletions {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying(&[])
        }
    }

    pub fn requests(&self) -> Vec<(String, Vec<PromptMessage>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompletionService for ScriptedCompletions {
    async fn complete(&self, api_key: &str, messages: &[PromptMessage]) -> PortResult<Completion> {
        self.requests
            .lock()
            .unwrap()
            .push((api_key.to_string(), messages.to_vec()));
        if self.fail {
            return Err(PortError::Unexpected("upstream unavailable".to_string()));
        }
        let content = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Completion {
            content,
            prompt_tokens: messages.len() as u32,
            completion_tokens: 1,
        })
    }
}
