use thiserror::Error;

use crate::entity::{EntityId, EntityKind};

/// A single offending field reported by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of the durable key-value store underneath the entity store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Storage quota exceeded writing '{key}' ({needed} bytes, limit {limit})")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("Storage backend failed on '{key}': {reason}")]
    Backend { key: String, reason: String },

    #[error("{} storage slot(s) failed to save: {}", .0.len(), join_persistence(.0))]
    Partial(Vec<PersistenceError>),
}

fn join_persistence(errors: &[PersistenceError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PersistenceError {
    pub fn backend(key: &str, reason: impl std::fmt::Display) -> Self {
        PersistenceError::Backend {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FarmError {
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Farm ID '{0}' is already in use")]
    DuplicateFarmId(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("Invalid entity type: {0}")]
    InvalidEntityType(String),

    #[error("{0}")]
    ConfirmationRequired(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl FarmError {
    /// Fields reported by a validation failure, empty for every other kind.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            FarmError::Validation(fields) => fields,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, FarmError>;
