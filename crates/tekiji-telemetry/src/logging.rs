//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor `[logging] level` is set.
pub const DEFAULT_FILTER: &str = "info,tekiji=debug";

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON lines when `RUST_ENV=production`, pretty otherwise.
    #[default]
    Auto,
    Pretty,
    Json,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives. `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    DEFAULT_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.level.trim().is_empty() {
            return Err("logging.level must not be empty".to_string());
        }
        self.filter().map(|_| ()).map_err(|e| e.to_string())
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        EnvFilter::try_new(&self.level).map_err(|e| {
            TelemetryError::LoggingInit(format!("invalid log filter {:?}: {e}", self.level))
        })
    }

    /// Whether to emit JSON, given the value of `RUST_ENV`.
    pub fn use_json(&self, rust_env: Option<&str>) -> bool {
        match self.format {
            LogFormat::Json => true,
            LogFormat::Pretty => false,
            LogFormat::Auto => rust_env == Some("production"),
        }
    }
}

/// Initialize tracing from `config`.
///
/// Returns an error if the filter does not parse or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.filter()?,
    };

    let rust_env = std::env::var("RUST_ENV").ok();
    let result = if config.use_json(rust_env.as_deref()) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
