//! Market-capitalization step tables.
//!
//! Two tables are keyed on market cap: the budget multiplier that widens or
//! narrows a rule's yen ceiling, and the entry offset applied to the quote
//! when pricing the buy order.

use crate::error::{ClassifierError, ClassifierResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rows apply to caps at or above `min_market_cap` (yen).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRow {
    pub min_market_cap: Decimal,
    pub multiplier: Decimal,
}

/// Step function over market cap, first row met wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    /// Strictly descending by `min_market_cap`.
    pub rows: Vec<TierRow>,
    /// Value for caps below the last row.
    pub below: Decimal,
}

impl TierTable {
    #[must_use]
    pub fn lookup(&self, market_cap: Decimal) -> Decimal {
        self.rows
            .iter()
            .find(|row| market_cap >= row.min_market_cap)
            .map_or(self.below, |row| row.multiplier)
    }

    pub fn validate(&self, name: &str) -> ClassifierResult<()> {
        for pair in self.rows.windows(2) {
            if pair[0].min_market_cap <= pair[1].min_market_cap {
                return Err(ClassifierError::ConfigError(format!(
                    "{name}: thresholds must be strictly descending ({} then {})",
                    pair[0].min_market_cap, pair[1].min_market_cap
                )));
            }
        }
        let negative = self
            .rows
            .iter()
            .map(|r| r.multiplier)
            .chain(std::iter::once(self.below))
            .find(|m| m.is_sign_negative());
        if let Some(m) = negative {
            return Err(ClassifierError::ConfigError(format!(
                "{name}: multiplier {m} must not be negative"
            )));
        }
        Ok(())
    }
}

fn oku(n: i64) -> Decimal {
    Decimal::from(n) * Decimal::from(100_000_000)
}

fn row(min_market_cap: Decimal, multiplier: Decimal) -> TierRow {
    TierRow {
        min_market_cap,
        multiplier,
    }
}

/// Budget multiplier by capitalization.
///
/// Caps from 1兆 up jump to 3x-6x while the band just below tops out at
/// 0.8x. The table is kept as tuned.
pub fn default_budget_multiplier_table() -> TierTable {
    let m = |v: i64, scale: u32| Decimal::new(v, scale);
    TierTable {
        rows: vec![
            row(oku(100_000), m(6, 0)),
            row(oku(90_000), m(5, 0)),
            row(oku(80_000), m(5, 0)),
            row(oku(70_000), m(5, 0)),
            row(oku(60_000), m(4, 0)),
            row(oku(50_000), m(4, 0)),
            row(oku(40_000), m(4, 0)),
            row(oku(30_000), m(3, 0)),
            row(oku(20_000), m(3, 0)),
            row(oku(10_000), m(3, 0)),
            row(oku(9_000), m(8, 1)),
            row(oku(8_000), m(7, 1)),
            row(oku(7_000), m(6, 1)),
            row(oku(6_000), m(5, 1)),
            row(oku(5_000), m(4, 1)),
            row(oku(4_000), m(3, 1)),
            row(oku(3_000), m(25, 2)),
            row(oku(2_000), m(25, 2)),
            row(oku(1_000), m(25, 2)),
            row(oku(600), m(25, 2)),
            row(oku(300), m(25, 2)),
            row(oku(150), m(25, 2)),
        ],
        below: m(2, 1),
    }
}

/// Quote offset for the entry limit price.
pub fn default_entry_offset_table() -> TierTable {
    TierTable {
        rows: vec![row(oku(300), Decimal::new(101, 2))],
        below: Decimal::new(98, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_budget_multiplier_steps() {
        let t = default_budget_multiplier_table();
        assert_eq!(t.lookup(dec!(12000000000000)), dec!(6));
        assert_eq!(t.lookup(dec!(10000000000000)), dec!(6));
        assert_eq!(t.lookup(dec!(9999999999999)), dec!(5));
        assert_eq!(t.lookup(dec!(4500000000000)), dec!(4));
        assert_eq!(t.lookup(dec!(1000000000000)), dec!(3));
        assert_eq!(t.lookup(dec!(950000000000)), dec!(0.8));
        assert_eq!(t.lookup(dec!(400000000000)), dec!(0.3));
        assert_eq!(t.lookup(dec!(100000000000)), dec!(0.25));
        assert_eq!(t.lookup(dec!(15000000000)), dec!(0.25));
        assert_eq!(t.lookup(dec!(14999999999)), dec!(0.2));
        assert_eq!(t.lookup(dec!(0)), dec!(0.2));
    }

    #[test]
    fn test_entry_offset() {
        let t = default_entry_offset_table();
        assert_eq!(t.lookup(dec!(30000000000)), dec!(1.01));
        assert_eq!(t.lookup(dec!(29999999999)), dec!(0.98));
    }

    #[test]
    fn test_default_tables_validate() {
        assert!(default_budget_multiplier_table().validate("budget").is_ok());
        assert!(default_entry_offset_table().validate("offset").is_ok());
    }

    #[test]
    fn test_validate_rejects_unsorted() {
        let t = TierTable {
            rows: vec![row(dec!(100), dec!(1)), row(dec!(200), dec!(2))],
            below: dec!(0.5),
        };
        assert!(t.validate("t").is_err());
    }

    #[test]
    fn test_validate_rejects_negative_multiplier() {
        let t = TierTable {
            rows: vec![row(dec!(100), dec!(1))],
            below: dec!(-0.5),
        };
        assert!(t.validate("t").is_err());
    }
}
