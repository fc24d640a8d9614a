//! Per-minute precision scheduler.
//!
//! The disclosure listing refreshes once a minute, so one cycle runs at a
//! fixed sub-second offset after every minute boundary. The wait is a coarse
//! sleep until shortly before the target followed by a spin on the wall
//! clock. Each cycle runs under a hard deadline; a cycle that overruns is
//! dropped, which cancels its in-flight broker calls, and is not retried.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tekiji_core::{BoxFuture, Clock, JstDateTime, JST};
use tekiji_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Offset after the minute boundary, in milliseconds.
    #[serde(default = "default_offset_ms")]
    pub offset_ms: u64,

    /// Spin instead of sleeping for this long before the target.
    #[serde(default = "default_coarse_margin_secs")]
    pub coarse_margin_secs: u64,

    /// Hard per-cycle deadline.
    #[serde(default = "default_cycle_deadline_secs")]
    pub cycle_deadline_secs: u64,
}

fn default_offset_ms() -> u64 {
    1_500
}

fn default_coarse_margin_secs() -> u64 {
    20
}

fn default_cycle_deadline_secs() -> u64 {
    40
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            offset_ms: default_offset_ms(),
            coarse_margin_secs: default_coarse_margin_secs(),
            cycle_deadline_secs: default_cycle_deadline_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.offset_ms >= 60_000 {
            return Err(format!(
                "scheduler.offset_ms must be below one minute, got {}",
                self.offset_ms
            ));
        }
        if self.coarse_margin_secs >= 60 {
            return Err(format!(
                "scheduler.coarse_margin_secs must be below one minute, got {}",
                self.coarse_margin_secs
            ));
        }
        if self.cycle_deadline_secs == 0 {
            return Err("scheduler.cycle_deadline_secs must be positive".to_string());
        }
        Ok(())
    }

    pub fn offset(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.offset_ms).unwrap_or(0))
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }
}

/// One unit of scheduled work.
///
/// The runner keeps its own state between cycles; a cycle cut off at the
/// deadline is simply dropped at its current await point.
pub trait CycleRunner: Send {
    fn run_cycle(&mut self) -> BoxFuture<'_, ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    TimedOut,
}

/// The next minute boundary after `now`, plus `offset`.
///
/// JST has a whole-hour offset, so UTC minute boundaries are JST minute
/// boundaries.
pub fn next_target(now: JstDateTime, offset: chrono::Duration) -> JstDateTime {
    let secs = now.timestamp();
    let next_minute = secs - secs.rem_euclid(60) + 60;
    let boundary = chrono::DateTime::from_timestamp(next_minute, 0)
        .map(|utc| utc.with_timezone(&JST))
        .unwrap_or(now + chrono::Duration::seconds(60));
    boundary + offset
}

/// Drives a [`CycleRunner`] once per minute.
pub struct PrecisionScheduler {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
}

impl PrecisionScheduler {
    pub fn new(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Sleep until `coarse_margin_secs` before `target`, then spin.
    pub async fn wait_until(&self, target: JstDateTime) {
        let margin = chrono::Duration::seconds(
            i64::try_from(self.config.coarse_margin_secs).unwrap_or(0),
        );
        let remaining = target - self.clock.now();
        if remaining > margin {
            if let Ok(coarse) = (remaining - margin).to_std() {
                tokio::time::sleep(coarse).await;
            }
        }

        while self.clock.now() < target {
            tokio::task::yield_now().await;
        }

        let drift = self.clock.now() - target;
        Metrics::wake_drift(drift.num_microseconds().unwrap_or(0) as f64 / 1000.0);
    }

    /// Run one cycle under the deadline.
    pub async fn run_cycle<R: CycleRunner + ?Sized>(&self, runner: &mut R) -> CycleOutcome {
        let started = Instant::now();
        match tokio::time::timeout(self.config.deadline(), runner.run_cycle()).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                Metrics::cycle_completed(elapsed.as_secs_f64());
                debug!(elapsed_ms = elapsed.as_millis() as u64, "Cycle completed");
                CycleOutcome::Completed
            }
            Err(_) => {
                Metrics::cycle_timeout();
                warn!(
                    deadline_secs = self.config.cycle_deadline_secs,
                    "Cycle exceeded deadline, abandoned"
                );
                CycleOutcome::TimedOut
            }
        }
    }

    /// Run cycles until `shutdown` is cancelled.
    pub async fn run<R: CycleRunner>(self, mut runner: R, shutdown: CancellationToken) {
        info!(
            offset_ms = self.config.offset_ms,
            coarse_margin_secs = self.config.coarse_margin_secs,
            cycle_deadline_secs = self.config.cycle_deadline_secs,
            "Starting precision scheduler"
        );

        loop {
            let target = next_target(self.clock.now(), self.config.offset());
            debug!(%target, "Waiting for next cycle");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.wait_until(target) => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.run_cycle(&mut runner) => {}
            }
        }

        info!("Precision scheduler stopped");
    }
}
