//! Application configuration.
//!
//! One TOML file feeds all three processes. Every section is optional; an
//! empty file yields the tuned defaults. Secrets never live in the file.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tekiji_broker::BrokerConfig;
use tekiji_classifier::ClassifierConfig;
use tekiji_executor::{EntryConfig, SchedulerConfig};
use tekiji_feed::FeedConfig;
use tekiji_position::{ExitConfig, ReaperConfig};
use tekiji_telemetry::LoggingConfig;

/// Config file used when neither `--config` nor `TEKIJI_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Overrides `[broker] base_url`.
pub const BROKER_URL_ENV: &str = "TEKIJI_BROKER_URL";
/// Overrides `[reaper] threshold_secs`.
pub const CANCEL_THRESHOLD_ENV: &str = "CANCEL_THRESHOLD_SECONDS";

/// `[persistence]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Symbols entered per day.
    #[serde(default = "default_entry_ledger_path")]
    pub entry_ledger_path: PathBuf,
    /// Symbols exited per day.
    #[serde(default = "default_exit_ledger_path")]
    pub exit_ledger_path: PathBuf,
    /// JSON Lines audit logs; the exit process reads purchase labels here.
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,
}

fn default_entry_ledger_path() -> PathBuf {
    PathBuf::from("data/entry_ledger.json")
}

fn default_exit_ledger_path() -> PathBuf {
    PathBuf::from("data/exit_ledger.json")
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("data/audit")
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            entry_ledger_path: default_entry_ledger_path(),
            exit_ledger_path: default_exit_ledger_path(),
            audit_dir: default_audit_dir(),
        }
    }
}

impl PersistenceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.entry_ledger_path == self.exit_ledger_path {
            return Err(format!(
                "persistence: entry and exit ledgers must be different files ({})",
                self.entry_ledger_path.display()
            ));
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub entry: EntryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
    #[serde(default)]
    pub exit: ExitConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<()> {
        if let Some(url) = lookup(BROKER_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.broker.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(CANCEL_THRESHOLD_ENV).filter(|v| !v.trim().is_empty()) {
            self.reaper.threshold_secs = raw.trim().parse().map_err(|e| {
                AppError::Config(format!("{CANCEL_THRESHOLD_ENV}={raw:?} is not a number: {e}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        let sections: [(&str, Result<(), String>); 8] = [
            ("broker", self.broker.validate()),
            ("feed", self.feed.validate()),
            ("entry", self.entry.validate()),
            ("scheduler", self.scheduler.validate()),
            ("reaper", self.reaper.validate()),
            ("exit", self.exit.validate()),
            ("persistence", self.persistence.validate()),
            ("logging", self.logging.validate()),
        ];
        for (name, result) in sections {
            result.map_err(|e| AppError::Config(format!("[{name}] {e}")))?;
        }
        self.classifier.validate()?;
        Ok(())
    }
}

/// `--config`, then `TEKIJI_CONFIG`, then [`DEFAULT_CONFIG_PATH`].
pub fn resolve_config_path(cli: Option<String>, env: Option<String>) -> PathBuf {
    cli.or(env)
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_is_default() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.broker.base_url, "http://localhost:18080/kabusapi");
        assert_eq!(config.entry.freshness_secs, 25);
        assert_eq!(config.scheduler.offset_ms, 1500);
        assert_eq!(config.reaper.threshold_secs, 30);
        assert_eq!(config.exit.poll_interval_ms, 2000);
        assert_eq!(config.persistence, PersistenceConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (BROKER_URL_ENV, "http://10.0.0.5:18081/kabusapi"),
            (CANCEL_THRESHOLD_ENV, " 45 "),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.broker.base_url, "http://10.0.0.5:18081/kabusapi");
        assert_eq!(config.reaper.threshold_secs, 45);
    }

    #[test]
    fn test_bad_threshold_override_is_config_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == CANCEL_THRESHOLD_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validation_names_section() {
        let config = AppConfig::from_toml("[exit]\nstop_fraction = \"1.5\"").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[exit]"), "{err}");
    }

    #[test]
    fn test_same_ledger_for_both_sides_rejected() {
        let config = AppConfig::from_toml(
            "[persistence]\nentry_ledger_path = \"a.json\"\nexit_ledger_path = \"a.json\"",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_section() {
        let config =
            AppConfig::from_toml("[logging]\nlevel = \"warn,tekiji=info\"\nformat = \"json\"")
                .unwrap();
        assert_eq!(config.logging.level, "warn,tekiji=info");
        assert_eq!(config.logging.format, tekiji_telemetry::LogFormat::Json);
        assert!(config.logging.use_json(None));

        let config = AppConfig::from_toml("[logging]\nlevel = \"\"").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[logging]"), "{err}");
    }

    #[test]
    fn test_resolve_config_path_precedence() {
        assert_eq!(
            resolve_config_path(Some("cli.toml".into()), Some("env.toml".into())),
            PathBuf::from("cli.toml")
        );
        assert_eq!(
            resolve_config_path(None, Some("env.toml".into())),
            PathBuf::from("env.toml")
        );
        assert_eq!(resolve_config_path(None, None), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_shipped_default_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = AppConfig::from_file(path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.classifier.budget_rules.len(), 11);
    }
}
