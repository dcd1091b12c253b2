//! Database error types.

use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    #[error("Row {id:?} could not be decoded: {reason}")]
    InvalidRow { id: Option<i64>, reason: String },

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_row(id: Option<i64>, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            id,
            reason: reason.into(),
        }
    }

    /// Check if error is retryable (connection-level problems).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Sqlx(
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            )
        )
    }
}
