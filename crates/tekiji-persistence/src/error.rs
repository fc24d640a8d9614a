//! Persistence error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ledger lock {0} could not be acquired")]
    LockTimeout(String),

    #[error("Ledger writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
