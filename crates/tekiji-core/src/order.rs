//! Order side and order intent types.

use crate::decimal::{Price, Shares};
use crate::types::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[inline]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// A limit order the bot wants the broker to place.
///
/// `limit_price` has already been through [`crate::quantize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub limit_price: Price,
    pub qty: Shares,
}

impl OrderIntent {
    pub fn buy(symbol: Symbol, limit_price: Price, qty: Shares) -> Self {
        Self {
            symbol,
            side: OrderSide::Buy,
            limit_price,
            qty,
        }
    }

    pub fn sell(symbol: Symbol, limit_price: Price, qty: Shares) -> Self {
        Self {
            symbol,
            side: OrderSide::Sell,
            limit_price,
            qty,
        }
    }

    /// Total cost at the limit price.
    pub fn notional(&self) -> Decimal {
        self.limit_price.notional(self.qty)
    }
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
}
