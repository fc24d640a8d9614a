//! Profit-target exits.
//!
//! A fully filled buy is closed with a sell at
//! `avg_fill × base_markup × label_multiplier`, floored to the tick, for the
//! whole filled quantity. The label comes from the entry process's purchase
//! log; unknown or unlisted labels use 1.0.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tekiji_core::{quantize, BudgetLabel, LiveOrder, OrderSide, Price, Shares, Symbol};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitTargetConfig {
    #[serde(default = "default_base_markup")]
    pub base_markup: Decimal,

    /// Extra multiplier per budget label, keyed by the label's snake_case name.
    #[serde(default = "default_label_multipliers")]
    pub label_multipliers: BTreeMap<BudgetLabel, Decimal>,
}

fn default_base_markup() -> Decimal {
    Decimal::new(103, 2)
}

pub fn default_label_multipliers() -> BTreeMap<BudgetLabel, Decimal> {
    use BudgetLabel::*;
    BTreeMap::from([
        (UpwardRevisionWithDividend, Decimal::new(102, 2)),
        (TreasuryAcquireAndCancel, Decimal::new(1015, 3)),
        (TreasuryCancel, Decimal::ONE),
        (Favorable, Decimal::new(103, 2)),
        (BusinessAlliance, Decimal::new(101, 2)),
        (CapitalAlliance, Decimal::new(101, 2)),
        (ShareholderBenefit, Decimal::new(102, 2)),
        (TreasuryAcquire, Decimal::new(101, 2)),
        (UpwardRevision, Decimal::new(101, 2)),
        (Completion, Decimal::new(103, 2)),
        (Adopted, Decimal::new(103, 2)),
    ])
}

impl Default for ProfitTargetConfig {
    fn default() -> Self {
        Self {
            base_markup: default_base_markup(),
            label_multipliers: default_label_multipliers(),
        }
    }
}

impl ProfitTargetConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_markup <= Decimal::ZERO {
            return Err(format!(
                "exit.base_markup must be positive, got {}",
                self.base_markup
            ));
        }
        if let Some((label, m)) = self
            .label_multipliers
            .iter()
            .find(|(_, m)| **m <= Decimal::ZERO)
        {
            return Err(format!("exit.label_multipliers.{label:?} must be positive, got {m}"));
        }
        Ok(())
    }

    /// Multiplier for `label`, 1.0 when absent.
    pub fn label_multiplier(&self, label: Option<BudgetLabel>) -> Decimal {
        label
            .and_then(|l| self.label_multipliers.get(&l).copied())
            .unwrap_or(Decimal::ONE)
    }
}

/// A sell to place against a filled buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitExit {
    pub buy_order_id: String,
    pub symbol: Symbol,
    pub label: Option<BudgetLabel>,
    pub avg_fill_price: Price,
    pub multiplier: Decimal,
    pub limit_price: Price,
    pub qty: Shares,
}

/// Fully filled buys that still need a profit-target sell.
///
/// `converted` holds buy order ids handled by this process;
/// `already_exited` reports symbols an earlier run already exited today.
/// Orders with no priced execution records are skipped.
pub fn plan_profit_exits(
    orders: &[LiveOrder],
    converted: &HashSet<String>,
    already_exited: impl Fn(&Symbol) -> bool,
    labels: &HashMap<Symbol, BudgetLabel>,
    config: &ProfitTargetConfig,
) -> Vec<ProfitExit> {
    orders
        .iter()
        .filter(|o| o.side == OrderSide::Buy && o.is_fully_filled())
        .filter(|o| !converted.contains(&o.order_id) && !already_exited(&o.symbol))
        .filter_map(|order| {
            let avg_fill_price = order.weighted_fill_price()?;
            let label = labels.get(&order.symbol).copied();
            let multiplier = config.label_multiplier(label);
            let limit_price = quantize(
                avg_fill_price * config.base_markup * multiplier,
                OrderSide::Sell,
            );
            if limit_price.is_zero() {
                return None;
            }
            Some(ProfitExit {
                buy_order_id: order.order_id.clone(),
                symbol: order.symbol.clone(),
                label,
                avg_fill_price,
                multiplier,
                limit_price,
                qty: order.cum_qty,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tekiji_core::{DetailKind, FillDetail, OrderState};

    fn filled_buy(id: &str, symbol: &str, fills: &[(Decimal, u64)]) -> LiveOrder {
        let qty: u64 = fills.iter().map(|(_, q)| q).sum();
        LiveOrder {
            order_id: id.to_string(),
            symbol: Symbol::new(symbol),
            side: OrderSide::Buy,
            state: OrderState::Filled,
            price: Some(Price::new(dec!(1010))),
            order_qty: Shares(qty),
            cum_qty: Shares(qty),
            received_at: None,
            details: fills
                .iter()
                .map(|(p, q)| FillDetail::execution(Price::new(*p), Shares(*q)))
                .collect(),
        }
    }

    fn labels(symbol: &str, label: BudgetLabel) -> HashMap<Symbol, BudgetLabel> {
        HashMap::from([(Symbol::new(symbol), label)])
    }

    #[test]
    fn test_weighted_average_with_label_multiplier() {
        // 1005 × 1.03 × 1.02 = 1055.853 → 1055
        let orders = vec![filled_buy("B1", "7203", &[(dec!(1000), 100), (dec!(1010), 100)])];
        let exits = plan_profit_exits(
            &orders,
            &HashSet::new(),
            |_| false,
            &labels("7203", BudgetLabel::UpwardRevisionWithDividend),
            &ProfitTargetConfig::default(),
        );
        assert_eq!(exits.len(), 1);
        let exit = &exits[0];
        assert_eq!(exit.avg_fill_price, Price::new(dec!(1005)));
        assert_eq!(exit.multiplier, dec!(1.02));
        assert_eq!(exit.limit_price, Price::new(dec!(1055)));
        assert_eq!(exit.qty, Shares(200));
    }

    #[test]
    fn test_unknown_label_uses_base_markup_only() {
        // 3000 × 1.03 = 3090 → 5-yen band → 3090
        let orders = vec![filled_buy("B1", "6758", &[(dec!(3000), 100)])];
        let exits = plan_profit_exits(
            &orders,
            &HashSet::new(),
            |_| false,
            &HashMap::new(),
            &ProfitTargetConfig::default(),
        );
        assert_eq!(exits[0].multiplier, Decimal::ONE);
        assert_eq!(exits[0].label, None);
        assert_eq!(exits[0].limit_price, Price::new(dec!(3090)));
    }

    #[test]
    fn test_skips_converted_exited_and_unfilled() {
        let mut partial = filled_buy("B3", "9984", &[(dec!(1000), 100)]);
        partial.order_qty = Shares(200);
        partial.state = OrderState::PartiallyFilled;
        let orders = vec![
            filled_buy("B1", "7203", &[(dec!(1000), 100)]),
            filled_buy("B2", "6758", &[(dec!(1000), 100)]),
            partial,
        ];
        let converted = HashSet::from(["B1".to_string()]);
        let exits = plan_profit_exits(
            &orders,
            &converted,
            |s| s.as_str() == "6758",
            &HashMap::new(),
            &ProfitTargetConfig::default(),
        );
        assert!(exits.is_empty());
    }

    #[test]
    fn test_skips_orders_without_execution_records() {
        let mut order = filled_buy("B1", "7203", &[(dec!(1000), 100)]);
        order.details[0].kind = DetailKind::Other;
        let exits = plan_profit_exits(
            &[order],
            &HashSet::new(),
            |_| false,
            &HashMap::new(),
            &ProfitTargetConfig::default(),
        );
        assert!(exits.is_empty());
    }

    #[test]
    fn test_label_multipliers_from_toml() {
        let config: ProfitTargetConfig = toml::from_str(
            r#"
            base_markup = "1.05"

            [label_multipliers]
            favorable = "1.10"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_markup, dec!(1.05));
        assert_eq!(config.label_multiplier(Some(BudgetLabel::Favorable)), dec!(1.10));
        assert_eq!(config.label_multiplier(Some(BudgetLabel::Adopted)), Decimal::ONE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_multipliers_cover_every_matched_label() {
        let config = ProfitTargetConfig::default();
        assert_eq!(config.label_multipliers.len(), 11);
        assert!(!config.label_multipliers.contains_key(&BudgetLabel::Unmatched));
        assert_eq!(
            config.label_multiplier(Some(BudgetLabel::TreasuryAcquireAndCancel)),
            dec!(1.015)
        );
    }
}
