// ⚠️ Error taxonomy for the tagging engine
//
// NotFound / Forbidden / Conflict / Validation are detected synchronously and
// carry enough context to act on. Store failures pass through untouched.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Referenced dimension, tag, recipient, payment item or owner is absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Entity exists but belongs to a different owner
    #[error("{entity} {id} belongs to another owner")]
    Forbidden { entity: &'static str, id: String },

    /// Duplicate normalized name, or two tags from one dimension
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A persisted value no longer decodes (amount, date, JSON payload)
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn forbidden(entity: &'static str, id: impl Into<String>) -> Self {
        Error::Forbidden {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::new(field, message))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Corrupt(err.to_string())
    }
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// 1-based source line, set for import rows
    pub row: Option<usize>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            row: None,
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn at_row(row: usize, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            row: Some(row),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: {}: {}", row, self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}
