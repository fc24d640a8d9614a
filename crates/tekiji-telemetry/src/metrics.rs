//! Prometheus metrics for the order lifecycle.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure here means a duplicate
//! metric name, which is a programming error caught at first use during
//! startup, never in the middle of a trading cycle.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_int_gauge, Counter,
    CounterVec, Encoder, Histogram, IntGauge, TextEncoder,
};

// ============================================================================
// Entry
// ============================================================================

/// Disclosures that survived feed filtering.
pub static DISCLOSURES_SEEN_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tekiji_disclosures_seen_total",
        "Disclosures that passed the feed filter"
    )
    .unwrap()
});

/// Buy orders submitted.
/// Labels: label (budget label key)
pub static ENTRY_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tekiji_entry_submitted_total",
        "Buy orders submitted by the entry controller",
        &["label"]
    )
    .unwrap()
});

/// Disclosures skipped by the entry controller.
/// Labels: reason
pub static ENTRY_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tekiji_entry_skipped_total",
        "Disclosures skipped by the entry controller",
        &["reason"]
    )
    .unwrap()
});

/// Symbols processed today (dedup set size).
pub static PROCESSED_SYMBOLS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "tekiji_processed_symbols",
        "Symbols already processed in the current trading day"
    )
    .unwrap()
});

// ============================================================================
// Scheduler
// ============================================================================

/// Completed scan cycles.
pub static CYCLES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("tekiji_cycles_total", "Entry scan cycles completed").unwrap()
});

/// Cycles abandoned at the deadline.
pub static CYCLE_TIMEOUTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tekiji_cycle_timeouts_total",
        "Entry scan cycles abandoned at the deadline"
    )
    .unwrap()
});

/// Cycle wall time in seconds.
pub static CYCLE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tekiji_cycle_duration_seconds",
        "Entry scan cycle wall time",
        vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0]
    )
    .unwrap()
});

/// Milliseconds between the scheduled target and the actual wake-up.
pub static WAKE_DRIFT_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tekiji_wake_drift_ms",
        "Scheduler wake-up drift past the target instant",
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0]
    )
    .unwrap()
});

// ============================================================================
// Broker / exit side
// ============================================================================

/// Broker call failures.
/// Labels: op, kind
pub static BROKER_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tekiji_broker_errors_total",
        "Broker call failures",
        &["op", "kind"]
    )
    .unwrap()
});

/// Stale unfilled buys cancelled by the reaper.
pub static STALE_CANCELS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tekiji_stale_cancels_total",
        "Stale unfilled buy orders cancelled"
    )
    .unwrap()
});

/// Sell orders replaced by the stop-loss.
pub static STOP_LOSS_REPLACEMENTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tekiji_stop_loss_replacements_total",
        "Resting sell orders replaced by the stop-loss"
    )
    .unwrap()
});

/// Profit-target sells submitted.
/// Labels: label
pub static PROFIT_EXITS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tekiji_profit_exits_total",
        "Profit-target sell orders submitted",
        &["label"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn disclosure_seen() {
        DISCLOSURES_SEEN_TOTAL.inc();
    }

    /// Record a submitted buy.
    pub fn entry_submitted(label: &str) {
        ENTRY_SUBMITTED_TOTAL.with_label_values(&[label]).inc();
    }

    /// Record a skipped disclosure.
    pub fn entry_skipped(reason: &str) {
        ENTRY_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn processed_symbols(count: usize) {
        PROCESSED_SYMBOLS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record a finished cycle and its duration.
    pub fn cycle_completed(duration_secs: f64) {
        CYCLES_TOTAL.inc();
        CYCLE_DURATION_SECONDS.observe(duration_secs);
    }

    pub fn cycle_timeout() {
        CYCLE_TIMEOUTS_TOTAL.inc();
    }

    pub fn wake_drift(drift_ms: f64) {
        WAKE_DRIFT_MS.observe(drift_ms);
    }

    /// Record a broker failure. `kind` comes from the broker error classifier.
    pub fn broker_error(op: &str, kind: &str) {
        BROKER_ERRORS_TOTAL.with_label_values(&[op, kind]).inc();
    }

    pub fn stale_cancel() {
        STALE_CANCELS_TOTAL.inc();
    }

    pub fn stop_loss_replacement() {
        STOP_LOSS_REPLACEMENTS_TOTAL.inc();
    }

    pub fn profit_exit(label: &str) {
        PROFIT_EXITS_TOTAL.with_label_values(&[label]).inc();
    }

    /// Render the default registry in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_render() {
        Metrics::entry_skipped("stale_disclosure");
        Metrics::broker_error("quote", "transport");
        Metrics::cycle_completed(0.4);

        let text = Metrics::render().unwrap();
        assert!(text.contains("tekiji_entry_skipped_total"));
        assert!(text.contains("reason=\"stale_disclosure\""));
        assert!(text.contains("tekiji_broker_errors_total"));
        assert!(text.contains("tekiji_cycle_duration_seconds_bucket"));
    }

    #[test]
    fn test_processed_symbols_gauge() {
        Metrics::processed_symbols(3);
        assert_eq!(PROCESSED_SYMBOLS.get(), 3);
    }
}
