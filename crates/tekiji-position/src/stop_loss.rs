//! Stop-loss rewrite planning.
//!
//! A long position breaches its stop when the current price is at or below
//! `entry × stop_fraction`. Every resting sell order for that symbol is then
//! cancelled and replaced by a sell for its unfilled remainder at
//! `entry × replacement_fraction`, floored to the tick.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tekiji_core::{quantize, LiveOrder, OrderSide, Position, Price, Shares, Symbol};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopLossConfig {
    #[serde(default = "default_stop_fraction")]
    pub stop_fraction: Decimal,

    #[serde(default = "default_replacement_fraction")]
    pub replacement_fraction: Decimal,

    /// Pause between the cancel and the replacement. The broker does not
    /// release the position for a new closing order immediately.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_stop_fraction() -> Decimal {
    Decimal::new(97, 2)
}

fn default_replacement_fraction() -> Decimal {
    Decimal::new(95, 2)
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

impl Default for StopLossConfig {
    fn default() -> Self {
        Self {
            stop_fraction: default_stop_fraction(),
            replacement_fraction: default_replacement_fraction(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl StopLossConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("stop_fraction", self.stop_fraction),
            ("replacement_fraction", self.replacement_fraction),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(format!("exit.{name} must be in (0, 1], got {value}"));
            }
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Cancel `order_id` and resell `remaining` at `replacement_price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopLossAction {
    pub order_id: String,
    pub symbol: Symbol,
    pub entry_price: Price,
    pub current_price: Price,
    pub remaining: Shares,
    pub replacement_price: Price,
}

/// Resting sells that must be rewritten this poll.
///
/// Long positions are indexed by symbol; if the broker reports several for
/// one symbol the last one wins. A sell already priced at or below the
/// replacement price is left alone, so a rewritten order is not rewritten
/// again on the next poll.
pub fn plan_stop_loss(
    positions: &[Position],
    orders: &[LiveOrder],
    config: &StopLossConfig,
) -> Vec<StopLossAction> {
    let by_symbol: HashMap<&Symbol, &Position> = positions
        .iter()
        .filter(|p| p.side == OrderSide::Buy)
        .map(|p| (&p.symbol, p))
        .collect();

    orders
        .iter()
        .filter(|o| o.side == OrderSide::Sell && o.state.is_open())
        .filter(|o| !o.remaining_qty().is_zero())
        .filter_map(|order| {
            let position = by_symbol.get(&order.symbol)?;
            if !position.stop_breached(config.stop_fraction) {
                return None;
            }
            let current_price = position.current_price?;
            let replacement_price = quantize(
                position.entry_price * config.replacement_fraction,
                OrderSide::Sell,
            );
            if replacement_price.is_zero() {
                return None;
            }
            if order.price.is_some_and(|p| p <= replacement_price) {
                return None;
            }
            Some(StopLossAction {
                order_id: order.order_id.clone(),
                symbol: order.symbol.clone(),
                entry_price: position.entry_price,
                current_price,
                remaining: order.remaining_qty(),
                replacement_price,
            })
        })
        .collect()
}
