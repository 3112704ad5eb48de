//! crates/gptremix_core/src/assistants.rs
//!
//! Assistant workflows: creation, import/export, forking and context editing.
//! Each workflow validates its raw input before touching the database port.

use crate::domain::{Assistant, ContextMessage, NewContextMessage, Role};
use crate::ports::{DatabaseService, PortError};
use crate::validation::{require_non_empty, FieldErrors, ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const UNIQUE_NAME_MESSAGE: &str = "Assistant names must be unique!";

//=========================================================================================
// Export Format
//=========================================================================================

/// The portable JSON form of an assistant, as produced by export and accepted by import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantExport {
    pub name: String,
    pub messages: Vec<ExportedMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedMessage {
    pub role: String,
    pub content: String,
}

impl From<&ContextMessage> for ExportedMessage {
    fn from(message: &ContextMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

impl From<&Assistant> for AssistantExport {
    fn from(assistant: &Assistant) -> Self {
        Self {
            name: assistant.name.clone(),
            messages: assistant.context_messages.iter().map(ExportedMessage::from).collect(),
        }
    }
}

/// Renders the context as newline-delimited JSON, the format accepted by [`parse_context_lines`].
pub fn to_context_lines(messages: &[ContextMessage]) -> String {
    messages
        .iter()
        .map(|m| serde_json::to_string(&ExportedMessage::from(m)).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

//=========================================================================================
// Context Parsing
//=========================================================================================

/// Validates one `{role, content}` item, pushing `[index]: ...` messages on failure.
fn check_item(
    index: usize,
    role: Option<&str>,
    content: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<NewContextMessage> {
    let role = match role {
        Some(r) if !r.is_empty() => match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                errors.push(format!(
                    "[{}]: role required to be one of system, user, assistant",
                    index
                ));
                None
            }
        },
        _ => {
            errors.push(format!("[{}]: role required to be a non empty string", index));
            None
        }
    };

    let content = match content {
        Some(c) if !c.trim().is_empty() => Some(c),
        _ => {
            errors.push(format!("[{}]: content required to be a non empty string", index));
            None
        }
    };

    Some(NewContextMessage {
        role: role?,
        content: content?.to_string(),
    })
}

fn check_value(index: usize, value: &Value, errors: &mut Vec<String>) -> Option<NewContextMessage> {
    match value.as_object() {
        Some(object) => check_item(
            index,
            object.get("role").and_then(Value::as_str),
            object.get("content").and_then(Value::as_str),
            errors,
        ),
        None => {
            errors.push(format!(
                "[{}]: object required with \"role\" and \"content\" properties",
                index
            ));
            None
        }
    }
}

/// Validates already-structured `(role, content)` pairs.
pub fn validate_context<'a, I>(items: I) -> Result<Vec<NewContextMessage>, Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut errors = Vec::new();
    let messages: Vec<_> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, (role, content))| check_item(i, Some(role), Some(content), &mut errors))
        .collect();

    if errors.is_empty() {
        Ok(messages)
    } else {
        Err(errors)
    }
}

/// Parses newline-delimited JSON into context messages.
///
/// Blank lines are skipped but still count towards the reported line index.
/// An empty input yields an empty context.
pub fn parse_context_lines(raw: &str) -> Result<Vec<NewContextMessage>, Vec<String>> {
    let mut errors = Vec::new();
    let mut messages = Vec::new();

    for (i, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                if let Some(message) = check_value(i, &value, &mut errors) {
                    messages.push(message);
                }
            }
            Err(_) => errors.push(format!("[{}]: unable to parse as json", i)),
        }
    }

    if errors.is_empty() {
        Ok(messages)
    } else {
        Err(errors)
    }
}

/// A validated import document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantImport {
    pub name: String,
    pub messages: Vec<NewContextMessage>,
}

/// Parses an exported assistant. All failures are reported against the `import` field.
pub fn parse_import(raw: &str) -> Result<AssistantImport, FieldErrors> {
    if raw.trim().is_empty() {
        return Err(FieldErrors::single("import", "Assistant import is required"));
    }

    let document: Value = serde_json::from_str(raw).map_err(|_| {
        FieldErrors::single("import", "Invalid import for assistant: Invalid JSON")
    })?;

    let name = document
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            FieldErrors::single("import", "Invalid import for assistant. `name` is required")
        })?;

    // A missing or non-array `messages` imports an assistant without context.
    let messages = match document.get("messages").and_then(Value::as_array) {
        Some(items) => {
            let mut errors = Vec::new();
            let messages: Vec<_> = items
                .iter()
                .enumerate()
                .filter_map(|(i, v)| check_value(i, v, &mut errors))
                .collect();
            if !errors.is_empty() {
                return Err(FieldErrors::single("import", errors.join(", ")));
            }
            messages
        }
        None => Vec::new(),
    };

    Ok(AssistantImport {
        name: name.to_string(),
        messages,
    })
}

//=========================================================================================
// Workflows
//=========================================================================================

fn conflict_as_field(field: &'static str) -> impl FnOnce(PortError) -> ServiceError {
    move |e| match e {
        PortError::Conflict(_) => {
            ServiceError::Validation(FieldErrors::single(field, UNIQUE_NAME_MESSAGE))
        }
        other => other.into(),
    }
}

/// Creates an assistant after checking its name. Duplicate names surface as a `name` field error.
pub async fn create_assistant(
    db: &dyn DatabaseService,
    user_id: Uuid,
    name: &str,
    context: &[NewContextMessage],
) -> ServiceResult<Assistant> {
    let mut errors = FieldErrors::new();
    let name = require_non_empty(&mut errors, "name", name, "Name is required");
    errors.into_result()?;
    let name = name.unwrap_or_default();

    db.create_assistant(user_id, name, context)
        .await
        .map_err(conflict_as_field("name"))
}

/// Creates an assistant from raw `(role, content)` pairs, reporting name and
/// context problems together.
pub async fn create_assistant_from_input(
    db: &dyn DatabaseService,
    user_id: Uuid,
    name: &str,
    context: &[(&str, &str)],
) -> ServiceResult<Assistant> {
    let mut errors = FieldErrors::new();
    require_non_empty(&mut errors, "name", name, "Name is required");
    let context = match validate_context(context.iter().copied()) {
        Ok(context) => context,
        Err(problems) => {
            errors.insert("context", problems.join(", "));
            Vec::new()
        }
    };
    errors.into_result()?;

    create_assistant(db, user_id, name, &context).await
}

pub async fn import_assistant(
    db: &dyn DatabaseService,
    user_id: Uuid,
    raw: &str,
) -> ServiceResult<Assistant> {
    let import = parse_import(raw).map_err(ServiceError::Validation)?;
    db.create_assistant(user_id, &import.name, &import.messages)
        .await
        .map_err(conflict_as_field("import"))
}

/// Copies an owned assistant's context under a new name.
pub async fn fork_assistant(
    db: &dyn DatabaseService,
    user_id: Uuid,
    assistant_id: Uuid,
    name: &str,
) -> ServiceResult<Assistant> {
    let source = db.get_assistant(user_id, assistant_id).await?;
    let context: Vec<NewContextMessage> =
        source.context_messages.iter().map(NewContextMessage::from).collect();
    create_assistant(db, user_id, name, &context).await
}

/// Replaces the context from newline-delimited JSON input.
pub async fn update_context(
    db: &dyn DatabaseService,
    user_id: Uuid,
    assistant_id: Uuid,
    raw: &str,
) -> ServiceResult<Assistant> {
    let context = parse_context_lines(raw).map_err(|errors| {
        ServiceError::Validation(FieldErrors::single("context", errors.join(", ")))
    })?;
    Ok(db.replace_context_messages(user_id, assistant_id, &context).await?)
}
