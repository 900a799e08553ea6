//! Database error types.

use thiserror::Error;
use vitals_core::AppError;

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

    /// A stored row could not be mapped back into a domain value
    #[error("corrupt {entity} row: {reason}")]
    Corrupt { entity: &'static str, reason: String },
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        let kind = match &err {
            DatabaseError::Sqlx(_) => "query",
            DatabaseError::Migration(_) => "migration",
            DatabaseError::NotFound { .. } => "not_found",
            DatabaseError::Corrupt { .. } => "corrupt_row",
        };
        AppError::database(err.to_string())
            .in_component("metric-store")
            .with_context("kind", kind)
    }
}
