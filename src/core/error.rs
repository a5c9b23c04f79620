use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Unknown migration phase tag {0}")]
    UnknownPhase(u8),

    #[error("Unknown migration phase name '{0}'")]
    UnknownPhaseName(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Event channel error: {0}")]
    Channel(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Validation cancelled")]
    Cancelled,

    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl<T> From<std::sync::PoisonError<T>> for SyncError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
