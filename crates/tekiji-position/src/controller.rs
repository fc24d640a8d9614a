//! Exit poll loop.
//!
//! One loop per process drives both concerns off the same snapshot: stop-loss
//! rewrites first, then profit-target sells for newly filled buys.

use crate::error::PositionResult;
use crate::exit::{plan_profit_exits, ProfitExit, ProfitTargetConfig};
use crate::stop_loss::{plan_stop_loss, StopLossAction, StopLossConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tekiji_broker::DynBroker;
use tekiji_core::{BudgetLabel, Clock, OrderIntent, OrderSide, Symbol};
use tekiji_persistence::{
    read_purchase_labels, AuditLog, CancelReason, CancellationRecord, DailyLedger, OrderReason,
    SubmissionRecord,
};
use tekiji_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// `[exit]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(flatten)]
    pub stop_loss: StopLossConfig,

    #[serde(flatten)]
    pub profit: ProfitTargetConfig,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stop_loss: StopLossConfig::default(),
            profit: ProfitTargetConfig::default(),
        }
    }
}

impl ExitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("exit.poll_interval_ms must be positive".to_string());
        }
        self.stop_loss.validate()?;
        self.profit.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// What one poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitTick {
    pub stop_loss_replaced: usize,
    pub profit_exits: usize,
}

/// Stop-loss and profit-target loop.
///
/// Holds the process-lifetime set of converted buy order ids. The set is
/// cleared when the JST date changes; the on-disk exit ledger carries the
/// same information across restarts.
pub struct ExitController {
    config: ExitConfig,
    broker: DynBroker,
    clock: Arc<dyn Clock>,
    /// Directory holding the entry process's purchase log.
    audit_dir: PathBuf,
    ledger: DailyLedger,
    converted: HashSet<String>,
    labels: HashMap<Symbol, BudgetLabel>,
    orders_log: AuditLog<SubmissionRecord>,
    cancels_log: AuditLog<CancellationRecord>,
}

impl ExitController {
    pub fn new(
        config: ExitConfig,
        broker: DynBroker,
        clock: Arc<dyn Clock>,
        audit_dir: impl Into<PathBuf>,
        ledger: DailyLedger,
    ) -> PositionResult<Self> {
        let audit_dir = audit_dir.into();
        Ok(Self {
            orders_log: AuditLog::new(&audit_dir, 1)?,
            cancels_log: AuditLog::new(&audit_dir, 1)?,
            config,
            broker,
            clock,
            audit_dir,
            ledger,
            converted: HashSet::new(),
            labels: HashMap::new(),
        })
    }

    pub fn converted(&self) -> &HashSet<String> {
        &self.converted
    }

    /// Reset day-scoped state if the date moved, then reload labels.
    fn roll_day(&mut self) {
        let today = self.clock.now().date_naive();
        match self.ledger.roll_to(today) {
            Ok(true) => {
                info!(%today, cleared = self.converted.len(), "New trading day, resetting converted orders");
                self.converted.clear();
                self.labels.clear();
            }
            Ok(false) => {
                if let Err(e) = self.ledger.refresh() {
                    warn!(error = %e, "Failed to refresh exit ledger");
                }
            }
            Err(e) => warn!(error = %e, "Failed to roll exit ledger"),
        }

        match read_purchase_labels(&self.audit_dir, today) {
            Ok(labels) => self.labels = labels,
            Err(e) => warn!(error = %e, "Failed to read purchase labels, keeping previous"),
        }
    }

    /// One poll over positions and orders.
    pub async fn run_once(&mut self) -> PositionResult<ExitTick> {
        self.roll_day();

        let positions = self.broker.positions().await.map_err(|e| {
            Metrics::broker_error("positions", e.kind());
            e
        })?;
        let orders = self.broker.orders().await.map_err(|e| {
            Metrics::broker_error("orders", e.kind());
            e
        })?;

        let mut tick = ExitTick::default();

        for action in plan_stop_loss(&positions, &orders, &self.config.stop_loss) {
            if self.replace_stop_loss(action).await {
                tick.stop_loss_replaced += 1;
            }
        }

        let ledger = &self.ledger;
        let exits = plan_profit_exits(
            &orders,
            &self.converted,
            |s| ledger.contains(s),
            &self.labels,
            &self.config.profit,
        );
        for exit in exits {
            if self.submit_profit_exit(exit).await {
                tick.profit_exits += 1;
            }
        }

        debug!(
            positions = positions.len(),
            orders = orders.len(),
            replaced = tick.stop_loss_replaced,
            exits = tick.profit_exits,
            "Exit poll"
        );
        Ok(tick)
    }

    /// Cancel, wait, resell. Returns true if the replacement was accepted.
    async fn replace_stop_loss(&mut self, action: StopLossAction) -> bool {
        warn!(
            symbol = %action.symbol,
            order_id = %action.order_id,
            entry = %action.entry_price,
            current = %action.current_price,
            replacement = %action.replacement_price,
            remaining = %action.remaining,
            "Stop-loss triggered"
        );

        if let Err(e) = self.broker.cancel_order(&action.order_id).await {
            Metrics::broker_error("cancel_order", e.kind());
            warn!(order_id = %action.order_id, error = %e, "Stop-loss cancel failed, skipping replacement");
            return false;
        }
        self.audit_cancel(CancellationRecord {
            timestamp: self.clock.now().fixed_offset(),
            order_id: action.order_id.clone(),
            symbol: action.symbol.clone(),
            reason: CancelReason::StopLoss,
            age_secs: None,
        });

        tokio::time::sleep(self.config.stop_loss.settle_delay()).await;

        let intent = OrderIntent::sell(action.symbol.clone(), action.replacement_price, action.remaining);
        match self.broker.submit_order(&intent).await {
            Ok(ack) => {
                Metrics::stop_loss_replacement();
                info!(
                    symbol = %action.symbol,
                    order_id = %ack.order_id,
                    price = %action.replacement_price,
                    qty = %action.remaining,
                    "Stop-loss sell submitted"
                );
                self.audit_order(SubmissionRecord {
                    timestamp: self.clock.now().fixed_offset(),
                    symbol: action.symbol,
                    side: OrderSide::Sell,
                    reason: OrderReason::StopLoss,
                    price: action.replacement_price,
                    qty: action.remaining,
                    order_id: ack.order_id,
                    source_order_id: action.order_id,
                });
                true
            }
            Err(e) => {
                Metrics::broker_error("submit_order", e.kind());
                error!(
                    symbol = %action.symbol,
                    cancelled_order_id = %action.order_id,
                    error = %e,
                    "Stop-loss replacement rejected after cancel"
                );
                false
            }
        }
    }

    /// Returns true if the sell was accepted.
    async fn submit_profit_exit(&mut self, exit: ProfitExit) -> bool {
        let intent = OrderIntent::sell(exit.symbol.clone(), exit.limit_price, exit.qty);
        let ack = match self.broker.submit_order(&intent).await {
            Ok(ack) => ack,
            Err(e) => {
                Metrics::broker_error("submit_order", e.kind());
                warn!(
                    symbol = %exit.symbol,
                    buy_order_id = %exit.buy_order_id,
                    error = %e,
                    "Profit-target sell failed, will retry next poll"
                );
                return false;
            }
        };

        let label_key = exit.label.map_or("unknown", |l| l.as_str());
        Metrics::profit_exit(label_key);
        info!(
            symbol = %exit.symbol,
            buy_order_id = %exit.buy_order_id,
            order_id = %ack.order_id,
            avg_fill = %exit.avg_fill_price,
            multiplier = %exit.multiplier,
            price = %exit.limit_price,
            qty = %exit.qty,
            label = label_key,
            "Profit-target sell submitted"
        );

        self.converted.insert(exit.buy_order_id.clone());
        if let Err(e) = self.ledger.record(&exit.symbol).await {
            warn!(symbol = %exit.symbol, error = %e, "Failed to persist exit ledger");
        }
        self.audit_order(SubmissionRecord {
            timestamp: self.clock.now().fixed_offset(),
            symbol: exit.symbol,
            side: OrderSide::Sell,
            reason: OrderReason::ProfitTarget,
            price: exit.limit_price,
            qty: exit.qty,
            order_id: ack.order_id,
            source_order_id: exit.buy_order_id,
        });
        true
    }

    fn audit_order(&mut self, record: SubmissionRecord) {
        if let Err(e) = self.orders_log.append(record) {
            warn!(error = %e, "Failed to write order audit record");
        }
    }

    fn audit_cancel(&mut self, record: CancellationRecord) {
        if let Err(e) = self.cancels_log.append(record) {
            warn!(error = %e, "Failed to write cancellation audit record");
        }
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            stop_fraction = %self.config.stop_loss.stop_fraction,
            replacement_fraction = %self.config.stop_loss.replacement_fraction,
            base_markup = %self.config.profit.base_markup,
            "Starting exit controller"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "Exit poll failed");
            }
        }

        for result in [self.orders_log.close(), self.cancels_log.close()] {
            if let Err(e) = result {
                warn!(error = %e, "Failed to close audit log");
            }
        }
        info!(converted = self.converted.len(), "Exit controller stopped");
    }
}
