//! Process wiring.

use crate::config::AppConfig;
use crate::error::AppResult;
use std::sync::Arc;
use tekiji_broker::{ApiKey, DynBroker, KabuClient};
use tekiji_classifier::Classifier;
use tekiji_core::{Clock, SystemClock};
use tekiji_executor::{EntryController, EntryState, PrecisionScheduler};
use tekiji_feed::{build_source, DisclosureFilter, DynDisclosureSource};
use tekiji_persistence::{AuditLog, DailyLedger};
use tekiji_position::{ExitController, StaleOrderReaper};
use tekiji_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which loop this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Entry,
    Reaper,
    Exit,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Entry => "entry",
            Self::Reaper => "reaper",
            Self::Exit => "exit",
        })
    }
}

/// Shared collaborators for whichever loop is started.
pub struct Application {
    config: AppConfig,
    broker: DynBroker,
    clock: Arc<dyn Clock>,
}

impl Application {
    /// Wire the live kabu station client.
    pub fn new(config: AppConfig, api_key: ApiKey) -> AppResult<Self> {
        let broker = Arc::new(KabuClient::new(config.broker.clone(), api_key)?);
        Ok(Self::with_broker(config, broker, Arc::new(SystemClock)))
    }

    pub fn with_broker(config: AppConfig, broker: DynBroker, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            broker,
            clock,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Entry controller reading from `source`.
    pub fn entry_controller(&self, source: DynDisclosureSource) -> AppResult<EntryController> {
        let today = self.clock.now().date_naive();
        let persistence = &self.config.persistence;
        let ledger = DailyLedger::open(&persistence.entry_ledger_path, today)?;
        // Written through: the exit process reads labels from this file.
        let purchases = AuditLog::new(&persistence.audit_dir, 1)?;
        let filter = DisclosureFilter::new(&self.config.feed, self.config.entry.sessions.clone());
        let classifier = Classifier::new(self.config.classifier.clone())?;

        Ok(EntryController::new(
            self.config.entry.clone(),
            classifier,
            filter,
            source,
            self.broker.clone(),
            self.clock.clone(),
            EntryState::new(ledger),
            purchases,
        )?)
    }

    pub fn reaper(&self) -> AppResult<StaleOrderReaper> {
        let audit = AuditLog::new(&self.config.persistence.audit_dir, 1)?;
        Ok(StaleOrderReaper::new(
            self.config.reaper.clone(),
            self.broker.clone(),
            self.clock.clone(),
            audit,
        ))
    }

    pub fn exit_controller(&self) -> AppResult<ExitController> {
        let today = self.clock.now().date_naive();
        let persistence = &self.config.persistence;
        let ledger = DailyLedger::open(&persistence.exit_ledger_path, today)?;
        Ok(ExitController::new(
            self.config.exit.clone(),
            self.broker.clone(),
            self.clock.clone(),
            &persistence.audit_dir,
            ledger,
        )?)
    }

    /// Run `role` until `shutdown` is cancelled.
    pub async fn run(self, role: Role, shutdown: CancellationToken) -> AppResult<()> {
        info!(%role, broker = %self.config.broker.base_url, "Starting loop");

        match role {
            Role::Entry => {
                let source = build_source(&self.config.feed.source)?;
                let controller = self.entry_controller(source)?;
                let scheduler =
                    PrecisionScheduler::new(self.config.scheduler.clone(), self.clock.clone());
                scheduler.run(controller, shutdown).await;
            }
            Role::Reaper => self.reaper()?.run(shutdown).await,
            Role::Exit => self.exit_controller()?.run(shutdown).await,
        }

        match Metrics::render() {
            Ok(snapshot) => info!(%role, metrics = %snapshot, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to render metrics"),
        }
        info!(%role, "Loop stopped");
        Ok(())
    }
}
