//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Ownership is enforced inside every statement: rows are matched on both the
//! entity id and the requesting user's id, so a foreign id behaves exactly like
//! a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gptremix_core::domain::{
    Assistant, AssistantSummary, Chat, ChatSummary, ContextMessage, Message, NewContextMessage,
    NewMessage, User, UserCredentials, UserSettings,
};
use gptremix_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps unique-constraint violations to `Conflict`, everything else to `Unexpected`.
fn write_error(e: sqlx::Error, what: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            warn!("Uniqueness violation while writing {}", what);
            PortError::Conflict(format!("{} already exists", what))
        }
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    api_key: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.id,
            email: self.email,
            settings: UserSettings {
                api_key: self.api_key,
            },
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct AssistantRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl AssistantRecord {
    fn to_domain(self, context_messages: Vec<ContextMessage>) -> Assistant {
        Assistant {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            context_messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AssistantSummaryRecord {
    id: Uuid,
    name: String,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ContextMessageRecord {
    id: Uuid,
    position: i32,
    role: String,
    content: String,
}
impl ContextMessageRecord {
    fn to_domain(self) -> PortResult<ContextMessage> {
        Ok(ContextMessage {
            id: self.id,
            position: self.position,
            role: self.role.parse().map_err(PortError::Unexpected)?,
            content: self.content,
        })
    }
}

#[derive(FromRow)]
struct ChatRecord {
    id: Uuid,
    user_id: Uuid,
    assistant_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ChatRecord {
    fn to_domain(self, messages: Vec<Message>) -> Chat {
        Chat {
            id: self.id,
            user_id: self.user_id,
            assistant_id: self.assistant_id,
            messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ChatSummaryRecord {
    id: Uuid,
    assistant_id: Uuid,
    assistant_name: String,
    message_count: i64,
    updated_at: DateTime<Utc>,
}
impl ChatSummaryRecord {
    fn to_domain(self) -> ChatSummary {
        ChatSummary {
            id: self.id,
            assistant_id: self.assistant_id,
            assistant_name: self.assistant_name,
            message_count: self.message_count,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    chat_id: Uuid,
    role: String,
    content: String,
    token_count: i32,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        Ok(Message {
            id: self.id,
            chat_id: self.chat_id,
            role: self.role.parse().map_err(PortError::Unexpected)?,
            content: self.content,
            token_count: self.token_count,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// Shared Queries
//=========================================================================================

const CHAT_SUMMARY_SELECT: &str = "SELECT c.id, c.assistant_id, a.name AS assistant_name, \
     COUNT(m.id) AS message_count, c.updated_at \
     FROM chats c \
     JOIN assistants a ON a.id = c.assistant_id \
     LEFT JOIN messages m ON m.chat_id = c.id";

impl DbAdapter {
    async fn context_for(&self, assistant_id: Uuid) -> PortResult<Vec<ContextMessage>> {
        sqlx::query_as::<_, ContextMessageRecord>(
            "SELECT id, position, role, content FROM assistant_context_messages \
             WHERE assistant_id = $1 ORDER BY position ASC",
        )
        .bind(assistant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ContextMessageRecord::to_domain)
        .collect()
    }

    async fn messages_for(&self, chat_id: Uuid) -> PortResult<Vec<Message>> {
        sqlx::query_as::<_, MessageRecord>(
            "SELECT id, chat_id, role, content, token_count, created_at FROM messages \
             WHERE chat_id = $1 ORDER BY created_at ASC, seq ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(MessageRecord::to_domain)
        .collect()
    }
}

/// Writes the context rows for an assistant inside an open transaction.
async fn insert_context(
    tx: &mut Transaction<'_, Postgres>,
    assistant_id: Uuid,
    context: &[NewContextMessage],
) -> PortResult<Vec<ContextMessage>> {
    let mut stored = Vec::with_capacity(context.len());
    for (position, message) in context.iter().enumerate() {
        let record = sqlx::query_as::<_, ContextMessageRecord>(
            "INSERT INTO assistant_context_messages (id, assistant_id, position, role, content) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id, position, role, content",
        )
        .bind(Uuid::new_v4())
        .bind(assistant_id)
        .bind(position as i32)
        .bind(message.role.as_str())
        .bind(&message.content)
        .fetch_one(&mut **tx)
        .await
        .map_err(unexpected)?;
        stored.push(record.to_domain()?);
    }
    Ok(stored)
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users ---

    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING id, email, NULL::TEXT AS api_key",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "user"))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;

        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.id, u.email, s.api_key FROM users u \
             LEFT JOIN user_settings s ON s.user_id = u.id WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_user_api_key(&self, user_id: Uuid, api_key: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_settings (user_id, api_key) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET api_key = EXCLUDED.api_key",
        )
        .bind(user_id)
        .bind(api_key)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound("Auth session not found or expired".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Assistants ---

    async fn list_assistants(&self, user_id: Uuid) -> PortResult<Vec<AssistantSummary>> {
        let records = sqlx::query_as::<_, AssistantSummaryRecord>(
            "SELECT id, name, updated_at FROM assistants WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .map(|r| AssistantSummary {
                id: r.id,
                name: r.name,
                updated_at: r.updated_at,
            })
            .collect())
    }

    async fn get_assistant(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<Assistant> {
        let record = sqlx::query_as::<_, AssistantRecord>(
            "SELECT id, user_id, name, created_at, updated_at FROM assistants \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(assistant_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Assistant {} not found", assistant_id)))?;

        let context = self.context_for(record.id).await?;
        Ok(record.to_domain(context))
    }

    async fn create_assistant(
        &self,
        user_id: Uuid,
        name: &str,
        context: &[NewContextMessage],
    ) -> PortResult<Assistant> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, AssistantRecord>(
            "INSERT INTO assistants (id, user_id, name) VALUES ($1, $2, $3) \
             RETURNING id, user_id, name, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, "assistant name"))?;

        let stored = insert_context(&mut tx, record.id, context).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain(stored))
    }

    async fn replace_context_messages(
        &self,
        user_id: Uuid,
        assistant_id: Uuid,
        context: &[NewContextMessage],
    ) -> PortResult<Assistant> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, AssistantRecord>(
            "UPDATE assistants SET updated_at = now() WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, name, created_at, updated_at",
        )
        .bind(assistant_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Assistant {} not found", assistant_id)))?;

        sqlx::query("DELETE FROM assistant_context_messages WHERE assistant_id = $1")
            .bind(record.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let stored = insert_context(&mut tx, record.id, context).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain(stored))
    }

    async fn delete_assistant(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<()> {
        // Context messages, chats and their messages go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM assistants WHERE id = $1 AND user_id = $2")
            .bind(assistant_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Assistant {} not found", assistant_id)));
        }
        Ok(())
    }

    // --- Chats ---

    async fn list_chats(&self, user_id: Uuid) -> PortResult<Vec<ChatSummary>> {
        let query = format!(
            "{} WHERE c.user_id = $1 GROUP BY c.id, a.name ORDER BY c.updated_at DESC",
            CHAT_SUMMARY_SELECT
        );
        let records = sqlx::query_as::<_, ChatSummaryRecord>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(ChatSummaryRecord::to_domain).collect())
    }

    async fn list_chats_for_assistant(
        &self,
        user_id: Uuid,
        assistant_id: Uuid,
    ) -> PortResult<Vec<ChatSummary>> {
        let query = format!(
            "{} WHERE c.user_id = $1 AND c.assistant_id = $2 \
             GROUP BY c.id, a.name ORDER BY c.updated_at DESC",
            CHAT_SUMMARY_SELECT
        );
        let records = sqlx::query_as::<_, ChatSummaryRecord>(&query)
            .bind(user_id)
            .bind(assistant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(ChatSummaryRecord::to_domain).collect())
    }

    async fn get_chat(&self, user_id: Uuid, chat_id: Uuid) -> PortResult<Chat> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, user_id, assistant_id, created_at, updated_at FROM chats \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Chat {} not found", chat_id)))?;

        let messages = self.messages_for(record.id).await?;
        Ok(record.to_domain(messages))
    }

    async fn create_chat(&self, user_id: Uuid, assistant_id: Uuid) -> PortResult<Chat> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "INSERT INTO chats (id, user_id, assistant_id) \
             SELECT $1, a.user_id, a.id FROM assistants a WHERE a.id = $2 AND a.user_id = $3 \
             RETURNING id, user_id, assistant_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(assistant_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Assistant {} not found", assistant_id)))?;

        Ok(record.to_domain(Vec::new()))
    }

    async fn delete_chat(&self, user_id: Uuid, chat_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
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
        let record = sqlx::query_as::<_, MessageRecord>(
            "WITH chat AS ( \
                 UPDATE chats SET updated_at = now() WHERE id = $2 AND user_id = $3 RETURNING id \
             ) \
             INSERT INTO messages (id, chat_id, role, content, token_count) \
             SELECT $1, chat.id, $4, $5, $6 FROM chat \
             RETURNING id, chat_id, role, content, token_count, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(user_id)
        .bind(message.role.as_str())
        .bind(message.content)
        .bind(message.token_count)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Chat {} not found", chat_id)))?;

        record.to_domain()
    }
}
