//! Postgres-backed checks for `DbAdapter`.
//!
//! Each test gets a fresh database from `#[sqlx::test]` with the service's
//! migrations applied. Run with `DATABASE_URL` pointing at a server and
//! `cargo test -- --ignored`.

use api_lib::adapters::DbAdapter;
use gptremix_core::domain::{MessageRole, NewContextMessage, NewMessage, Role};
use gptremix_core::ports::{DatabaseService, PortError};
use sqlx::PgPool;
use uuid::Uuid;

async fn user(db: &DbAdapter, email: &str) -> Uuid {
    db.create_user_with_email(email, "hash").await.unwrap().user_id
}

fn ctx(role: Role, content: &str) -> NewContextMessage {
    NewContextMessage {
        role,
        content: content.to_string(),
    }
}

fn msg(role: MessageRole, content: &str) -> NewMessage {
    NewMessage {
        role,
        content: content.to_string(),
        token_count: 3,
    }
}

async fn message_rows(pool: &PgPool, chat_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
        .bind(chat_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn context_keeps_insertion_order(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let owner = user(&db, "a@example.com").await;

    let created = db
        .create_assistant(
            owner,
            "Helper",
            &[
                ctx(Role::System, "be brief"),
                ctx(Role::User, "hi"),
                ctx(Role::Assistant, "hello"),
            ],
        )
        .await
        .unwrap();

    let fetched = db.get_assistant(owner, created.id).await.unwrap();
    let roles: Vec<Role> = fetched.context_messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);

    let replaced = db
        .replace_context_messages(owner, created.id, &[ctx(Role::User, "only")])
        .await
        .unwrap();
    assert_eq!(replaced.context_messages.len(), 1);
    assert_eq!(replaced.context_messages[0].content, "only");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn assistant_names_are_unique_per_user(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let bob = user(&db, "bob@example.com").await;

    db.create_assistant(alice, "Helper", &[]).await.unwrap();
    let dup = db.create_assistant(alice, "Helper", &[]).await;
    assert!(matches!(dup, Err(PortError::Conflict(_))));

    // Another user may reuse the name.
    db.create_assistant(bob, "Helper", &[]).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn foreign_rows_look_missing(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let alice = user(&db, "alice@example.com").await;
    let mallory = user(&db, "mallory@example.com").await;

    let assistant = db.create_assistant(alice, "Helper", &[]).await.unwrap();
    let chat = db.create_chat(alice, assistant.id).await.unwrap();

    assert!(matches!(
        db.get_assistant(mallory, assistant.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        db.get_chat(mallory, chat.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        db.create_chat(mallory, assistant.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        db.add_message(mallory, chat.id, msg(MessageRole::User, "hi")).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        db.delete_assistant(mallory, assistant.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(db.list_chats(mallory).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn messages_come_back_in_send_order(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let owner = user(&db, "a@example.com").await;
    let assistant = db.create_assistant(owner, "Helper", &[]).await.unwrap();
    let chat = db.create_chat(owner, assistant.id).await.unwrap();

    for i in 0..3 {
        db.add_message(owner, chat.id, msg(MessageRole::User, &format!("q{}", i)))
            .await
            .unwrap();
        db.add_message(owner, chat.id, msg(MessageRole::Assistant, &format!("a{}", i)))
            .await
            .unwrap();
    }

    let fetched = db.get_chat(owner, chat.id).await.unwrap();
    let contents: Vec<&str> = fetched.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["q0", "a0", "q1", "a1", "q2", "a2"]);
    assert!(fetched.updated_at >= chat.updated_at);

    let summaries = db.list_chats(owner).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].message_count, 6);
    assert_eq!(summaries[0].assistant_name, "Helper");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn deleting_an_assistant_removes_its_chats(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let owner = user(&db, "a@example.com").await;
    let assistant = db.create_assistant(owner, "Helper", &[]).await.unwrap();
    let chat = db.create_chat(owner, assistant.id).await.unwrap();
    db.add_message(owner, chat.id, msg(MessageRole::User, "hi"))
        .await
        .unwrap();

    db.delete_assistant(owner, assistant.id).await.unwrap();

    assert!(matches!(
        db.get_chat(owner, chat.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(db.list_assistants(owner).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn sessions_expire_and_can_be_revoked(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let owner = user(&db, "a@example.com").await;
    let now = chrono::Utc::now();

    db.create_auth_session("live", owner, now + chrono::Duration::days(1))
        .await
        .unwrap();
    db.create_auth_session("stale", owner, now - chrono::Duration::days(1))
        .await
        .unwrap();

    assert_eq!(db.validate_auth_session("live").await.unwrap(), owner);
    assert!(db.validate_auth_session("stale").await.is_err());

    db.delete_auth_session("live").await.unwrap();
    assert!(db.validate_auth_session("live").await.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn api_key_is_stored_per_user(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let owner = user(&db, "a@example.com").await;
    assert!(db.get_user(owner).await.unwrap().settings.api_key.is_none());

    db.update_user_api_key(owner, "sk-first").await.unwrap();
    db.update_user_api_key(owner, "sk-second").await.unwrap();

    let stored = db.get_user(owner).await.unwrap();
    assert_eq!(stored.settings.api_key.as_deref(), Some("sk-second"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn deleting_a_chat_removes_its_message_rows(pool: PgPool) {
    let db = DbAdapter::new(pool.clone());
    let owner = user(&db, "a@example.com").await;
    let assistant = db.create_assistant(owner, "Helper", &[]).await.unwrap();
    let doomed = db.create_chat(owner, assistant.id).await.unwrap();
    let kept = db.create_chat(owner, assistant.id).await.unwrap();

    for chat_id in [doomed.id, kept.id] {
        db.add_message(owner, chat_id, msg(MessageRole::User, "hi"))
            .await
            .unwrap();
        db.add_message(owner, chat_id, msg(MessageRole::Assistant, "hello"))
            .await
            .unwrap();
    }
    assert_eq!(message_rows(&pool, doomed.id).await, 2);

    db.delete_chat(owner, doomed.id).await.unwrap();

    assert_eq!(message_rows(&pool, doomed.id).await, 0);
    assert_eq!(message_rows(&pool, kept.id).await, 2);
    assert!(matches!(
        db.delete_chat(owner, doomed.id).await,
        Err(PortError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn foreign_writes_are_rejected_and_leave_rows_intact(pool: PgPool) {
    let db = DbAdapter::new(pool.clone());
    let alice = user(&db, "alice@example.com").await;
    let mallory = user(&db, "mallory@example.com").await;

    let assistant = db
        .create_assistant(alice, "Helper", &[ctx(Role::System, "be brief")])
        .await
        .unwrap();
    let chat = db.create_chat(alice, assistant.id).await.unwrap();
    db.add_message(alice, chat.id, msg(MessageRole::User, "hi"))
        .await
        .unwrap();

    assert!(matches!(
        db.delete_chat(mallory, chat.id).await,
        Err(PortError::NotFound(_))
    ));
    assert!(matches!(
        db.replace_context_messages(mallory, assistant.id, &[ctx(Role::User, "pwned")])
            .await,
        Err(PortError::NotFound(_))
    ));

    let still_there = db.get_chat(alice, chat.id).await.unwrap();
    assert_eq!(still_there.messages.len(), 1);
    assert_eq!(message_rows(&pool, chat.id).await, 1);

    let context = db.get_assistant(alice, assistant.id).await.unwrap().context_messages;
    assert_eq!(context.len(), 1);
    assert_eq!(context[0].content, "be brief");
}
