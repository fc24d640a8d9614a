//! Classifier error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;
