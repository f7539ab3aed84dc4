//! Persistence error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("State file is not a JSON object: {0}")]
    InvalidStateFile(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
