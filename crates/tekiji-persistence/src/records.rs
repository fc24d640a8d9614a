//! Audit record types.

use crate::audit::AuditRecord;
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tekiji_core::{BudgetLabel, OrderSide, Price, Shares, Symbol};

/// An entry order the classifier sized and the broker accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub symbol: Symbol,
    pub label: BudgetLabel,
    pub headline: String,
    pub rationale: String,
    pub limit_price: Price,
    pub qty: Shares,
    pub total_cost: Decimal,
    pub market_cap: Decimal,
    pub order_id: String,
}

/// Why an exit order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderReason {
    ProfitTarget,
    StopLoss,
}

/// An exit order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub reason: OrderReason,
    pub price: Price,
    pub qty: Shares,
    pub order_id: String,
    /// Order this one replaces or closes out.
    pub source_order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Unfilled buy past the age threshold.
    Stale,
    StopLoss,
}

/// A cancel request the broker accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub order_id: String,
    pub symbol: Symbol,
    pub reason: CancelReason,
    pub age_secs: Option<i64>,
}

impl AuditRecord for PurchaseRecord {
    const KIND: &'static str = "purchases";

    fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

impl AuditRecord for SubmissionRecord {
    const KIND: &'static str = "orders";

    fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

impl AuditRecord for CancellationRecord {
    const KIND: &'static str = "cancellations";

    fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
