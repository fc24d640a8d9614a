//! Broker error types.
//!
//! None of these carry request headers, so the API key never reaches a log
//! line through an error.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// The broker answered with a non-success status.
    #[error("HTTP {status} (code {code:?}): {message}")]
    Http {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The request never got a response (connect failure, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP 200 with a non-zero result code.
    #[error("Order rejected (result {code})")]
    Rejected { code: i64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BrokerError {
    /// Transport failures and 5xx responses may succeed on a later poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Rejected { .. } => "rejected",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Config(_) => "config",
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
