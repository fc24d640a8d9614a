//! Stale-order reaper.
//!
//! Polls the broker's order list and cancels buy orders that are still
//! completely unfilled after a threshold. Cancels are fire-and-forget: a
//! failed cancel leaves the order unfilled and over threshold, so the next
//! poll picks it up again.

use crate::error::PositionResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tekiji_broker::DynBroker;
use tekiji_core::{Clock, JstDateTime, LiveOrder, OrderSide, Symbol};
use tekiji_persistence::{AuditLog, CancelReason, CancellationRecord};
use tekiji_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reaper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Age in seconds at which an unfilled buy is cancelled.
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: u64,

    /// Poll period in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_threshold_secs() -> u64 {
    30
}

fn default_interval_ms() -> u64 {
    5_000
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_secs(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl ReaperConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("reaper.interval_ms must be positive".to_string());
        }
        if i64::try_from(self.threshold_secs).is_err() {
            return Err(format!(
                "reaper.threshold_secs out of range: {}",
                self.threshold_secs
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// An order selected for cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleOrder {
    pub order_id: String,
    pub symbol: Symbol,
    pub age_secs: i64,
}

/// Unfilled, still-working buy orders at least `threshold_secs` old.
///
/// Orders without a receipt time are skipped.
pub fn select_stale(orders: &[LiveOrder], now: &JstDateTime, threshold_secs: u64) -> Vec<StaleOrder> {
    let threshold = i64::try_from(threshold_secs).unwrap_or(i64::MAX);
    orders
        .iter()
        .filter(|o| o.side == OrderSide::Buy && !o.has_fills() && o.state.is_open())
        .filter_map(|o| {
            let age_secs = o.age_secs_at(now)?;
            (age_secs >= threshold).then(|| StaleOrder {
                order_id: o.order_id.clone(),
                symbol: o.symbol.clone(),
                age_secs,
            })
        })
        .collect()
}

/// Periodic stale-order canceller.
pub struct StaleOrderReaper {
    config: ReaperConfig,
    broker: DynBroker,
    clock: Arc<dyn Clock>,
    audit: AuditLog<CancellationRecord>,
}

impl StaleOrderReaper {
    pub fn new(
        config: ReaperConfig,
        broker: DynBroker,
        clock: Arc<dyn Clock>,
        audit: AuditLog<CancellationRecord>,
    ) -> Self {
        Self {
            config,
            broker,
            clock,
            audit,
        }
    }

    /// One poll. Returns the number of cancels the broker accepted.
    pub async fn run_once(&mut self) -> PositionResult<usize> {
        let orders = self.broker.orders().await.map_err(|e| {
            Metrics::broker_error("orders", e.kind());
            e
        })?;
        let now = self.clock.now();
        let stale = select_stale(&orders, &now, self.config.threshold_secs);
        debug!(orders = orders.len(), stale = stale.len(), "Reaper poll");

        let mut cancelled = 0;
        for order in stale {
            match self.broker.cancel_order(&order.order_id).await {
                Ok(()) => {
                    cancelled += 1;
                    Metrics::stale_cancel();
                    info!(
                        order_id = %order.order_id,
                        symbol = %order.symbol,
                        age_secs = order.age_secs,
                        "Cancelled stale buy order"
                    );
                    let record = CancellationRecord {
                        timestamp: now.fixed_offset(),
                        order_id: order.order_id,
                        symbol: order.symbol,
                        reason: CancelReason::Stale,
                        age_secs: Some(order.age_secs),
                    };
                    if let Err(e) = self.audit.append(record) {
                        warn!(error = %e, "Failed to write cancellation audit record");
                    }
                }
                Err(e) => {
                    Metrics::broker_error("cancel_order", e.kind());
                    warn!(
                        order_id = %order.order_id,
                        symbol = %order.symbol,
                        error = %e,
                        "Stale cancel failed, will retry next poll"
                    );
                }
            }
        }
        Ok(cancelled)
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            threshold_secs = self.config.threshold_secs,
            interval_ms = self.config.interval_ms,
            "Starting stale-order reaper"
        );

        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "Reaper poll failed");
            }
        }

        if let Err(e) = self.audit.close() {
            warn!(error = %e, "Failed to close cancellation log");
        }
        info!("Stale-order reaper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tekiji_broker::MockBroker;
    use tekiji_core::{ManualClock, OrderIntent, OrderState, Price, Shares, JST};
    use tempfile::TempDir;

    fn now() -> JstDateTime {
        JST.with_ymd_and_hms(2025, 3, 10, 9, 1, 0).unwrap()
    }

    fn order(id: &str, side: OrderSide, state: OrderState, cum: u64, age_secs: i64) -> LiveOrder {
        LiveOrder {
            order_id: id.to_string(),
            symbol: Symbol::new("7203"),
            side,
            state,
            price: Some(Price::new(dec!(2510))),
            order_qty: Shares(200),
            cum_qty: Shares(cum),
            received_at: Some((now() - chrono::Duration::seconds(age_secs)).fixed_offset()),
            details: Vec::new(),
        }
    }

    #[test]
    fn test_select_stale_filters() {
        let mut no_time = order("F", OrderSide::Buy, OrderState::Accepted, 0, 60);
        no_time.received_at = None;
        let orders = vec![
            order("A", OrderSide::Buy, OrderState::Accepted, 0, 31),
            order("B", OrderSide::Buy, OrderState::Accepted, 0, 29),
            order("C", OrderSide::Buy, OrderState::PartiallyFilled, 100, 60),
            order("D", OrderSide::Sell, OrderState::Accepted, 0, 60),
            order("E", OrderSide::Buy, OrderState::Cancelled, 0, 60),
            no_time,
            order("G", OrderSide::Buy, OrderState::Accepted, 0, 30),
        ];
        let ids: Vec<_> = select_stale(&orders, &now(), 30)
            .into_iter()
            .map(|o| o.order_id)
            .collect();
        assert_eq!(ids, vec!["A", "G"]);
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: ReaperConfig = toml::from_str("").unwrap();
        assert_eq!(config, ReaperConfig::default());
        assert_eq!(config.threshold_secs, 30);
        assert!(config.validate().is_ok());
        assert!(ReaperConfig {
            interval_ms: 0,
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    fn reaper(broker: Arc<MockBroker>, clock: Arc<ManualClock>, dir: &TempDir) -> StaleOrderReaper {
        StaleOrderReaper::new(
            ReaperConfig::default(),
            broker,
            clock,
            AuditLog::new(dir.path(), 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_run_once_cancels_only_stale() {
        let dir = TempDir::new().unwrap();
        let broker = Arc::new(MockBroker::new());
        let clock = Arc::new(ManualClock::new(now()));
        broker.set_orders(vec![
            order("A", OrderSide::Buy, OrderState::Accepted, 0, 45),
            order("B", OrderSide::Buy, OrderState::Accepted, 0, 5),
        ]);

        let mut reaper = reaper(broker.clone(), clock, &dir);
        assert_eq!(reaper.run_once().await.unwrap(), 1);
        assert_eq!(broker.cancelled(), vec!["A".to_string()]);

        // A is terminal now; nothing further to do.
        assert_eq!(reaper.run_once().await.unwrap(), 0);
        assert_eq!(broker.cancelled().len(), 1);

        let log = std::fs::read_to_string(dir.path().join("cancellations_2025-03-10.jsonl")).unwrap();
        assert!(log.contains("\"reason\":\"stale\""));
        assert!(log.contains("\"order_id\":\"A\""));
    }

    #[tokio::test]
    async fn test_failed_cancel_retried_next_poll() {
        let dir = TempDir::new().unwrap();
        let broker = Arc::new(MockBroker::new());
        let clock = Arc::new(ManualClock::new(now()));
        broker.set_orders(vec![order("A", OrderSide::Buy, OrderState::Accepted, 0, 45)]);

        let mut reaper = reaper(broker.clone(), clock, &dir);
        broker.fail("cancel_order");
        assert_eq!(reaper.run_once().await.unwrap(), 0);
        broker.recover("cancel_order");
        assert_eq!(reaper.run_once().await.unwrap(), 1);
        assert_eq!(broker.live_orders()[0].state, OrderState::Cancelled);
    }

    #[tokio::test]
    async fn test_submitted_order_reaped_after_threshold() {
        let dir = TempDir::new().unwrap();
        let broker = Arc::new(MockBroker::new());
        let clock = Arc::new(ManualClock::new(now()));
        broker.set_received_at(Some(now().fixed_offset()));
        let intent = OrderIntent::buy(Symbol::new("6758"), Price::new(dec!(3105)), Shares(100));
        tekiji_broker::Broker::submit_order(broker.as_ref(), &intent)
            .await
            .unwrap();

        let mut reaper = reaper(broker.clone(), clock.clone(), &dir);
        clock.advance(chrono::Duration::seconds(29));
        assert_eq!(reaper.run_once().await.unwrap(), 0);
        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(reaper.run_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_orders_failure_surfaces() {
        let dir = TempDir::new().unwrap();
        let broker = Arc::new(MockBroker::new());
        let clock = Arc::new(ManualClock::new(now()));
        broker.fail("orders");
        let mut reaper = reaper(broker, clock, &dir);
        assert!(reaper.run_once().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let broker = Arc::new(MockBroker::new());
        let clock = Arc::new(ManualClock::new(now()));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(reaper(broker, clock, &dir).run(shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(12)).await;
        shutdown.cancel();
        handle.await.unwrap();
    }
}
