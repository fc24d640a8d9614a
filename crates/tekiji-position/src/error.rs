//! Position management error types.

use tekiji_broker::BrokerError;
use tekiji_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type PositionResult<T> = Result<T, PositionError>;
