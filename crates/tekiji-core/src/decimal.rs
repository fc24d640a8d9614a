//! Precision-safe numeric types for trading.
//!
//! Prices use `rust_decimal` for exact arithmetic; multipliers such as
//! 1.01 or 0.97 must not introduce floating-point drift before a price is
//! quantized to the exchange tick table.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Shares per round lot on the target exchange.
pub const ROUND_LOT: u64 = 100;

/// Price in yen with exact decimal precision.
///
/// Wraps `Decimal` so prices cannot be mixed with share counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Drop the fractional yen.
    #[inline]
    pub fn floor_yen(&self) -> Self {
        Self(self.0.floor())
    }

    /// Floor to a multiple of `tick`.
    #[inline]
    pub fn round_to_tick(&self, tick: Decimal) -> Self {
        if tick.is_zero() {
            return *self;
        }
        Self((self.0 / tick).floor() * tick)
    }

    /// Cost of `qty` shares at this price.
    #[inline]
    pub fn notional(&self, qty: Shares) -> Decimal {
        self.0 * Decimal::from(qty.0)
    }

    /// Whole-yen value for wire formats that expect integers.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.trunc().to_i64()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Share count.
///
/// Order quantities are whole shares; entry quantities are always a
/// multiple of [`ROUND_LOT`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Shares(pub u64);

impl Shares {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// `lots` round lots.
    #[inline]
    pub fn lots(lots: u64) -> Self {
        Self(lots * ROUND_LOT)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_round_lot_multiple(&self) -> bool {
        self.0 % ROUND_LOT == 0
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Shares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Shares {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
