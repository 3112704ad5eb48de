//! crates/gptremix_core/src/validation.rs
//!
//! Field-level validation errors and the error type returned by the core workflows.

use crate::ports::PortError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Validation messages keyed by the input field they refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Records a message for `field`. A later message for the same field replaces the earlier one.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

/// The error type for the core workflows.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// The user has not stored a completion-API key yet.
    #[error("No completion API key is configured for this user")]
    MissingApiKey,

    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Returns the trimmed value, or records `message` against `field`.
pub fn require_non_empty<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: &'a str,
    message: &str,
) -> Option<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, message);
        None
    } else {
        Some(trimmed)
    }
}

/// Checks signup credentials.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ServiceError> {
    let mut errors = FieldErrors::new();
    let email = email.trim();
    if email.len() <= 3 || !email.contains('@') {
        errors.insert("email", "Email is invalid");
    }
    if password.is_empty() {
        errors.insert("password", "Password is required");
    } else if password.chars().count() < 8 {
        errors.insert("password", "Password is too short");
    }
    errors.into_result()
}
