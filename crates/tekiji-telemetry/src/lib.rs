//! Prometheus metrics and structured logging for tekiji-bot.
//!
//! All three processes (entry, reaper, exit) share one metric namespace
//! (`tekiji_*`) and the same subscriber setup.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::Metrics;
