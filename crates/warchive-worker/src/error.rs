//! Worker error types.

use std::time::Duration;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Staging failed: {0}")]
    StagingFailed(String),

    #[error("Run deadline of {0:?} reached during selection")]
    SelectionTimeout(Duration),

    #[error("Storage error: {0}")]
    Storage(#[from] warchive_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] warchive_media::MediaError),

    #[error("Database error: {0}")]
    Db(#[from] warchive_db::DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn staging_failed(msg: impl Into<String>) -> Self {
        Self::StagingFailed(msg.into())
    }

    /// Whether a later run can be expected to succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::SelectionTimeout(_) => true,
            WorkerError::Storage(e) => !e.is_not_found(),
            WorkerError::Db(e) => e.is_retryable(),
            WorkerError::Media(warchive_media::MediaError::Timeout(_)) => true,
            _ => false,
        }
    }
}
