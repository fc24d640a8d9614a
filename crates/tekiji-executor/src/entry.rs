//! Entry order controller.
//!
//! Each cycle fetches the disclosure listing, filters it, and for every
//! candidate symbol walks the entry gates in order. A symbol moves from
//! unseen to entered exactly once per trading day: the in-memory set covers
//! this process, the on-disk ledger covers restarts.

use crate::error::{ExecutorError, ExecutorResult};
use crate::scheduler::CycleRunner;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tekiji_broker::DynBroker;
use tekiji_classifier::Classifier;
use tekiji_core::{
    quantize, BoxFuture, BudgetLabel, Clock, Disclosure, OrderIntent, OrderSide, Price,
    SessionWindows, Shares, Symbol, ROUND_LOT,
};
use tekiji_feed::{DisclosureFilter, DynDisclosureSource};
use tekiji_persistence::{AuditLog, DailyLedger, PersistenceResult, PurchaseRecord};
use tekiji_telemetry::Metrics;
use tracing::{debug, info, warn};

/// `[entry]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Maximum age of a disclosure, measured from its published minute.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: i64,

    #[serde(default)]
    pub sessions: SessionWindows,
}

fn default_freshness_secs() -> i64 {
    25
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
            sessions: SessionWindows::default(),
        }
    }
}

impl EntryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.freshness_secs <= 0 {
            return Err(format!(
                "entry.freshness_secs must be positive, got {}",
                self.freshness_secs
            ));
        }
        self.sessions.validate().map_err(|e| e.to_string())
    }
}

/// Why a candidate disclosure was not entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyEntered,
    NotFresh,
    OutsideSession,
    QuoteUnavailable,
    MarketCapUnavailable,
    /// The quantized limit price came out as zero.
    InvalidPrice,
    /// Unmatched headline or zero lots.
    NoQuantity,
    /// A broker call failed; the symbol stays eligible next cycle.
    BrokerFailure,
}

impl SkipReason {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyEntered => "already_entered",
            Self::NotFresh => "not_fresh",
            Self::OutsideSession => "outside_session",
            Self::QuoteUnavailable => "quote_unavailable",
            Self::MarketCapUnavailable => "market_cap_unavailable",
            Self::InvalidPrice => "invalid_price",
            Self::NoQuantity => "no_quantity",
            Self::BrokerFailure => "broker_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Submitted {
        order_id: String,
        limit_price: Price,
        qty: Shares,
        label: BudgetLabel,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl EntryOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}

/// Symbols entered today.
///
/// `processed` is this process's own record; `ledger` is shared with past
/// runs through the file. Both are reset when the JST date changes.
#[derive(Debug)]
pub struct EntryState {
    processed: BTreeSet<Symbol>,
    ledger: DailyLedger,
}

impl EntryState {
    pub fn new(ledger: DailyLedger) -> Self {
        Self {
            processed: BTreeSet::new(),
            ledger,
        }
    }

    pub fn is_entered(&self, symbol: &Symbol) -> bool {
        self.processed.contains(symbol) || self.ledger.contains(symbol)
    }

    /// Record an entry in memory and on disk.
    ///
    /// The in-memory record is made before the ledger write starts and is
    /// kept even if that write fails or the caller stops waiting for it.
    pub async fn mark_entered(&mut self, symbol: &Symbol) -> PersistenceResult<()> {
        self.processed.insert(symbol.clone());
        self.ledger.record(symbol).await.map(|_| ())
    }

    pub fn roll_to(&mut self, today: chrono::NaiveDate) -> PersistenceResult<()> {
        if self.ledger.roll_to(today)? {
            self.processed.clear();
        }
        Ok(())
    }

    pub fn processed(&self) -> &BTreeSet<Symbol> {
        &self.processed
    }
}

/// Classify-and-submit controller.
pub struct EntryController {
    config: EntryConfig,
    classifier: Classifier,
    filter: DisclosureFilter,
    source: DynDisclosureSource,
    broker: DynBroker,
    clock: Arc<dyn Clock>,
    state: EntryState,
    purchases: AuditLog<PurchaseRecord>,
}

impl EntryController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EntryConfig,
        classifier: Classifier,
        filter: DisclosureFilter,
        source: DynDisclosureSource,
        broker: DynBroker,
        clock: Arc<dyn Clock>,
        state: EntryState,
        purchases: AuditLog<PurchaseRecord>,
    ) -> ExecutorResult<Self> {
        config.validate().map_err(ExecutorError::Config)?;
        Ok(Self {
            config,
            classifier,
            filter,
            source,
            broker,
            clock,
            state,
            purchases,
        })
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    /// One pass over the current listing. Returns the outcome per candidate.
    pub async fn run_once(&mut self) -> ExecutorResult<Vec<(Symbol, EntryOutcome)>> {
        let today = self.clock.now().date_naive();
        self.state.roll_to(today)?;

        let rows = self.source.fetch().await?;
        let candidates = self.filter.apply(&rows, today);
        debug!(rows = rows.len(), candidates = candidates.len(), "Fetched disclosures");

        let mut outcomes = Vec::with_capacity(candidates.len());
        for disclosure in &candidates {
            Metrics::disclosure_seen();
            let outcome = self.process(disclosure).await;
            match &outcome {
                EntryOutcome::Submitted { label, .. } => Metrics::entry_submitted(label.as_str()),
                EntryOutcome::Skipped { reason } => Metrics::entry_skipped(reason.as_str()),
            }
            outcomes.push((disclosure.symbol.clone(), outcome));
        }

        // Retry purchase records a failed write left behind.
        self.purchases.flush()?;
        Metrics::processed_symbols(self.state.processed().len());
        Ok(outcomes)
    }

    /// Walk the entry gates for one disclosure.
    pub async fn process(&mut self, disclosure: &Disclosure) -> EntryOutcome {
        let symbol = &disclosure.symbol;

        if self.state.is_entered(symbol) {
            debug!(%symbol, "Already entered today");
            return EntryOutcome::skipped(SkipReason::AlreadyEntered);
        }

        let now = self.clock.now();
        if !disclosure.is_fresh_at(now.naive_local(), self.config.freshness_secs) {
            debug!(%symbol, disclosed_at = %disclosure.disclosed_at, "Disclosure outside freshness window");
            return EntryOutcome::skipped(SkipReason::NotFresh);
        }

        if !self.config.sessions.contains(disclosure.disclosed_at.time()) {
            return EntryOutcome::skipped(SkipReason::OutsideSession);
        }

        let quote = match self.broker.quote(symbol).await {
            Ok(Some(price)) if price.is_positive() => price,
            Ok(_) => {
                info!(%symbol, "No usable quote");
                return EntryOutcome::skipped(SkipReason::QuoteUnavailable);
            }
            Err(e) => {
                Metrics::broker_error("quote", e.kind());
                warn!(%symbol, error = %e, "Quote request failed");
                return EntryOutcome::skipped(SkipReason::BrokerFailure);
            }
        };

        let market_cap = match self.broker.symbol_info(symbol).await {
            Ok(info) => match info.market_cap {
                Some(cap) => cap,
                None => {
                    info!(%symbol, "Market capitalization unavailable");
                    return EntryOutcome::skipped(SkipReason::MarketCapUnavailable);
                }
            },
            Err(e) => {
                Metrics::broker_error("symbol_info", e.kind());
                warn!(%symbol, error = %e, "Symbol info request failed");
                return EntryOutcome::skipped(SkipReason::BrokerFailure);
            }
        };

        let headline = disclosure.headline.as_str();
        let offset = self.classifier.entry_offset(market_cap);
        let material = self.classifier.material_multiplier(headline);
        let limit_price = quantize(quote * offset * material, OrderSide::Buy);
        if limit_price.is_zero() {
            return EntryOutcome::skipped(SkipReason::InvalidPrice);
        }

        let cost_per_lot = limit_price.notional(Shares(ROUND_LOT));
        let cap_multiplier = self.classifier.capitalization_multiplier(market_cap);
        let decision = self
            .classifier
            .classify(headline, cost_per_lot, cap_multiplier);
        if !decision.should_order() {
            info!(%symbol, headline, rationale = %decision.rationale, "No order");
            return EntryOutcome::skipped(SkipReason::NoQuantity);
        }

        let intent = OrderIntent::buy(symbol.clone(), limit_price, decision.quantity);
        let ack = match self.broker.submit_order(&intent).await {
            Ok(ack) => ack,
            Err(e) => {
                Metrics::broker_error("submit_order", e.kind());
                warn!(%symbol, price = %limit_price, qty = %decision.quantity, error = %e, "Buy order failed");
                return EntryOutcome::skipped(SkipReason::BrokerFailure);
            }
        };

        let total_cost = intent.notional();
        info!(
            %symbol,
            headline,
            order_id = %ack.order_id,
            price = %limit_price,
            qty = %decision.quantity,
            total_cost = %total_cost,
            label = %decision.label,
            %market_cap,
            %quote,
            %offset,
            %material,
            %cap_multiplier,
            "Buy order submitted"
        );

        // The exit loop reads the label from this file, so it is written
        // before anything else can await.
        let record = PurchaseRecord {
            timestamp: now.fixed_offset(),
            symbol: symbol.clone(),
            label: decision.label,
            headline: disclosure.headline.clone(),
            rationale: decision.rationale,
            limit_price,
            qty: decision.quantity,
            total_cost,
            market_cap,
            order_id: ack.order_id.clone(),
        };
        if let Err(e) = self.purchases.append(record) {
            warn!(%symbol, error = %e, "Failed to write purchase record");
        }

        if let Err(e) = self.state.mark_entered(symbol).await {
            warn!(%symbol, error = %e, "Failed to persist entry ledger");
        }

        EntryOutcome::Submitted {
            order_id: ack.order_id,
            limit_price,
            qty: decision.quantity,
            label: decision.label,
        }
    }
}

impl CycleRunner for EntryController {
    fn run_cycle(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match self.run_once().await {
                Ok(outcomes) => {
                    let submitted = outcomes.iter().filter(|(_, o)| o.is_submitted()).count();
                    debug!(candidates = outcomes.len(), submitted, "Entry cycle finished");
                }
                Err(e) => warn!(error = %e, "Entry cycle failed"),
            }
        })
    }
}
