//! Core error types for questlog-core.
//!
//! This module defines the error hierarchy using thiserror. Three kinds of
//! failure matter to callers: a referenced entity is missing (`NotFound`),
//! the input is malformed (`Validation`), or the stored state is one that
//! should never exist (`Invariant`). Everything else is infrastructure.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for questlog-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A goal, task, checkin, or badge lookup came back empty
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A stored value violates an invariant the engines rely on
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str) -> Self {
        CoreError::NotFound { entity }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(target: "questlog::invariant", %message, "invariant violated");
        CoreError::Invariant(message)
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A uniqueness constraint rejected the write
    #[error("Conflicting row already exists: {0}")]
    Conflict(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value for a named field
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A cadence that requires a recurrence target is missing it
    #[error("{cadence} goals require {field}")]
    MissingTarget { cadence: String, field: String },
}

impl ValidationError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        tracing::warn!(target: "questlog::validation", %field, %message, "validation error");
        ValidationError::InvalidValue { field, message }
    }

    pub fn missing_target(cadence: impl Into<String>, field: impl Into<String>) -> Self {
        let cadence = cadence.into();
        let field = field.into();
        tracing::warn!(target: "questlog::validation", %cadence, %field, "missing recurrence target");
        ValidationError::MissingTarget { cadence, field }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked => DatabaseError::Locked,
                rusqlite::ErrorCode::ConstraintViolation => {
                    DatabaseError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
