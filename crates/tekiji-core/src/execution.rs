//! Broker-owned order snapshots.
//!
//! The bot never mutates these; it polls the broker and reasons about the
//! latest snapshot. Reaper, stop-loss and profit-exit decisions are all
//! functions of `LiveOrder` lists.

use crate::clock::JstDateTime;
use crate::decimal::{Price, Shares};
use crate::order::OrderSide;
use crate::types::Symbol;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order state as observed at the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Working at the exchange with no fills.
    Accepted,
    /// Working with some fills.
    PartiallyFilled,
    Filled,
    Cancelled,
    /// Rejected, expired or lapsed.
    Expired,
}

impl OrderState {
    /// Returns true if the order can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Expired)
    }

    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

/// Kind of an order detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailKind {
    Execution,
    Cancellation,
    Expiry,
    Other,
}

/// One detail record attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillDetail {
    pub kind: DetailKind,
    pub price: Option<Price>,
    pub qty: Shares,
}

impl FillDetail {
    pub fn execution(price: Price, qty: Shares) -> Self {
        Self {
            kind: DetailKind::Execution,
            price: Some(price),
            qty,
        }
    }
}

/// Snapshot of an order at the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOrder {
    pub order_id: String,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub state: OrderState,
    pub price: Option<Price>,
    pub order_qty: Shares,
    pub cum_qty: Shares,
    /// Broker receipt time. Kept with its own offset as reported.
    pub received_at: Option<DateTime<FixedOffset>>,
    pub details: Vec<FillDetail>,
}

impl LiveOrder {
    /// Ordered quantity not yet executed.
    pub fn remaining_qty(&self) -> Shares {
        self.order_qty.saturating_sub(self.cum_qty)
    }

    pub fn has_fills(&self) -> bool {
        !self.cum_qty.is_zero()
    }

    /// Terminal with every share executed.
    pub fn is_fully_filled(&self) -> bool {
        self.state == OrderState::Filled
            && !self.order_qty.is_zero()
            && self.cum_qty == self.order_qty
    }

    /// Fill-weighted average execution price over execution records.
    ///
    /// Returns `None` when there are no priced executions.
    pub fn weighted_fill_price(&self) -> Option<Price> {
        let (value, qty) = self
            .details
            .iter()
            .filter(|d| d.kind == DetailKind::Execution)
            .filter_map(|d| d.price.map(|p| (p, d.qty)))
            .fold((Decimal::ZERO, 0u64), |(value, qty), (price, q)| {
                (value + price.notional(q), qty + q.0)
            });
        if qty == 0 {
            return None;
        }
        Some(Price::new(value / Decimal::from(qty)))
    }

    /// Whole seconds since the broker received the order.
    pub fn age_secs_at(&self, now: &JstDateTime) -> Option<i64> {
        self.received_at
            .map(|received| now.signed_duration_since(received).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::JST;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn order() -> LiveOrder {
        LiveOrder {
            order_id: "20250310A01N00000001".to_string(),
            symbol: Symbol::new("7203"),
            side: OrderSide::Buy,
            state: OrderState::Filled,
            price: Some(Price::new(dec!(1010))),
            order_qty: Shares(200),
            cum_qty: Shares(200),
            received_at: None,
            details: vec![
                FillDetail {
                    kind: DetailKind::Other,
                    price: Some(Price::new(dec!(1010))),
                    qty: Shares(200),
                },
                FillDetail::execution(Price::new(dec!(1000)), Shares(100)),
                FillDetail::execution(Price::new(dec!(1010)), Shares(100)),
            ],
        }
    }

    #[test]
    fn test_order_state_terminal() {
        assert!(!OrderState::Accepted.is_terminal());
        assert!(!OrderState::PartiallyFilled.is_terminal());
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Expired.is_terminal());
    }

    #[test]
    fn test_weighted_fill_price_ignores_non_executions() {
        assert_eq!(order().weighted_fill_price(), Some(Price::new(dec!(1005))));
    }

    #[test]
    fn test_weighted_fill_price_uneven_lots() {
        let mut o = order();
        o.details = vec![
            FillDetail::execution(Price::new(dec!(1000)), Shares(300)),
            FillDetail::execution(Price::new(dec!(1020)), Shares(100)),
        ];
        assert_eq!(o.weighted_fill_price(), Some(Price::new(dec!(1005))));
    }

    #[test]
    fn test_weighted_fill_price_empty() {
        let mut o = order();
        o.details.clear();
        assert_eq!(o.weighted_fill_price(), None);
    }

    #[test]
    fn test_fully_filled() {
        let mut o = order();
        assert!(o.is_fully_filled());
        o.cum_qty = Shares(100);
        assert!(!o.is_fully_filled());
        assert_eq!(o.remaining_qty(), Shares(100));
    }

    #[test]
    fn test_age_secs() {
        let mut o = order();
        let received = DateTime::parse_from_rfc3339("2025-03-10T09:00:30.17592+09:00").unwrap();
        o.received_at = Some(received);
        let now = JST.with_ymd_and_hms(2025, 3, 10, 9, 1, 0).unwrap();
        assert_eq!(o.age_secs_at(&now), Some(29));
    }
}
