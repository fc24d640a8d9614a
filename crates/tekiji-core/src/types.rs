//! Instrument and position types.

use crate::decimal::{Price, Shares};
use crate::error::{CoreError, Result};
use crate::order::OrderSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a listed-instrument code.
const SYMBOL_LEN: usize = 4;

/// Four-character instrument code (e.g. "7203", "130A").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Wrap an already-normalised code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Normalise a code cell from a disclosure listing.
    ///
    /// Spaces (ASCII and ideographic) and hyphens are removed and the code is
    /// cut to four characters, so "7203 0" and "72-03" both become "7203".
    pub fn normalize(raw: &str) -> Result<Self> {
        let code: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '\u{3000}' | '-'))
            .take(SYMBOL_LEN)
            .collect();
        if code.chars().count() != SYMBOL_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(CoreError::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static instrument information from the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: Symbol,
    pub name: Option<String>,
    /// Market capitalization in yen.
    pub market_cap: Option<Decimal>,
}

/// Open position as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub entry_price: Price,
    /// Absent outside trading hours.
    pub current_price: Option<Price>,
    pub leaves_qty: Shares,
}

impl Position {
    /// Price at or below which a long position has breached its stop.
    pub fn stop_price(&self, stop_fraction: Decimal) -> Price {
        self.entry_price * stop_fraction
    }

    /// True if the current price is at or below `entry × stop_fraction`.
    pub fn stop_breached(&self, stop_fraction: Decimal) -> bool {
        match self.current_price {
            Some(current) if current.is_positive() => current <= self.stop_price(stop_fraction),
            _ => false,
        }
    }
}
