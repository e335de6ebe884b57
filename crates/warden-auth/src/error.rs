use std::fmt;

use thiserror::Error;

/// Kind of entity named by a `NotFound` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Team,
    User,
    Permission,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Project => write!(f, "project"),
            EntityKind::Team => write!(f, "team"),
            EntityKind::User => write!(f, "user"),
            EntityKind::Permission => write!(f, "permission"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    // Dangling reference in stored data
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration file not found at {0}, run `warden init` first")]
    ConfigNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        WardenError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WardenError::NotFound { .. })
    }
}

impl From<rusqlite::Error> for WardenError {
    fn from(e: rusqlite::Error) -> Self {
        WardenError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
