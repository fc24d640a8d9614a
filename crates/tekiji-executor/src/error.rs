//! Executor error types.

use tekiji_broker::BrokerError;
use tekiji_classifier::ClassifierError;
use tekiji_feed::FeedError;
use tekiji_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
