//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker error: {0}")]
    Broker(#[from] tekiji_broker::BrokerError),

    #[error("Feed error: {0}")]
    Feed(#[from] tekiji_feed::FeedError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] tekiji_classifier::ClassifierError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] tekiji_persistence::PersistenceError),

    #[error("Position error: {0}")]
    Position(#[from] tekiji_position::PositionError),

    #[error("Executor error: {0}")]
    Executor(#[from] tekiji_executor::ExecutorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tekiji_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
