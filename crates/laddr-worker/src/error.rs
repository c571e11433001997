//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] laddr_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] laddr_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] laddr_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether a retry with identical input could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Media(e) => e.is_retryable(),
            WorkerError::Storage(_) | WorkerError::Queue(_) | WorkerError::Io(_) => true,
            WorkerError::JobFailed(_) | WorkerError::ConfigError(_) => false,
        }
    }
}
