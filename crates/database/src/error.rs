//! Database error types.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Record already exists
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// The user already bookmarked an equivalent URL
    #[error("URL has already been bookmarked by this user: {url}")]
    DuplicateBookmark { url: String, existing_id: i64 },

    /// Field validation failed
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Stored or supplied event could not be parsed
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] bookmark_core::EventError),
}

impl DatabaseError {
    /// Whether the error is a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
