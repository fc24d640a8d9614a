//! Budget tiers and lot sizing.

use crate::rules::{Condition, TREASURY_PHRASES};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tekiji_core::{BudgetLabel, Shares};

/// One row of the budget table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRule {
    pub label: BudgetLabel,
    pub when: Condition,
    /// Yen ceiling before the capitalization multiplier.
    pub base_budget: Decimal,
}

/// Outcome of classifying a headline.
///
/// `quantity` is always a multiple of 100; zero means no order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetDecision {
    pub quantity: Shares,
    pub label: BudgetLabel,
    pub rationale: String,
}

impl BudgetDecision {
    pub fn unmatched() -> Self {
        Self {
            quantity: Shares::ZERO,
            label: BudgetLabel::Unmatched,
            rationale: "no budget rule matched".to_string(),
        }
    }

    pub fn should_order(&self) -> bool {
        !self.quantity.is_zero()
    }
}

impl BudgetRule {
    /// Size an entry against this rule's ceiling.
    ///
    /// When one lot already costs more than the adjusted ceiling the
    /// decision is a single lot, never zero.
    pub fn size(&self, cost_per_lot: Decimal, cap_multiplier: Decimal) -> BudgetDecision {
        let adjusted = (self.base_budget * cap_multiplier).floor();
        let label = self.label;

        if cost_per_lot <= Decimal::ZERO {
            return BudgetDecision {
                quantity: Shares::ZERO,
                label,
                rationale: format!("{label}: no usable cost per lot ({cost_per_lot})"),
            };
        }

        if cost_per_lot > adjusted {
            return BudgetDecision {
                quantity: Shares::lots(1),
                label,
                rationale: format!(
                    "{label}: cost per lot {cost_per_lot} exceeds adjusted budget {adjusted}, one lot"
                ),
            };
        }

        let lots = (adjusted / cost_per_lot).floor();
        match lots.to_u64() {
            Some(lots) if lots > 0 => BudgetDecision {
                quantity: Shares::lots(lots),
                label,
                rationale: format!("{label}: {lots} lot(s) (adjusted_budget={adjusted})"),
            },
            _ => BudgetDecision {
                quantity: Shares::ZERO,
                label,
                rationale: format!("{label}: nothing affordable within {adjusted}"),
            },
        }
    }
}

pub fn default_budget_rules() -> Vec<BudgetRule> {
    let yen = Decimal::from;
    vec![
        BudgetRule {
            label: BudgetLabel::TreasuryAcquireAndCancel,
            when: Condition::all_of(vec![
                Condition::contains("消却"),
                Condition::any_of(TREASURY_PHRASES),
            ]),
            base_budget: yen(1_500_000),
        },
        BudgetRule {
            label: BudgetLabel::TreasuryCancel,
            when: Condition::contains("自己株式の消却"),
            base_budget: yen(1_250_000),
        },
        BudgetRule {
            label: BudgetLabel::TreasuryAcquire,
            when: Condition::any_of(TREASURY_PHRASES),
            base_budget: yen(500_000),
        },
        BudgetRule {
            label: BudgetLabel::UpwardRevisionWithDividend,
            when: Condition::all_of(vec![Condition::contains("上方"), Condition::contains("増配")]),
            base_budget: yen(1_500_000),
        },
        BudgetRule {
            label: BudgetLabel::Favorable,
            when: Condition::contains("良好"),
            base_budget: yen(1_500_000),
        },
        BudgetRule {
            label: BudgetLabel::ShareholderBenefit,
            when: Condition::all_of(vec![
                Condition::contains("株主優待"),
                Condition::any_of(&["新設", "導入", "再開"]),
            ]),
            base_budget: yen(1_000_000),
        },
        BudgetRule {
            label: BudgetLabel::BusinessAlliance,
            when: Condition::contains("業務提携"),
            base_budget: yen(1_000_000),
        },
        BudgetRule {
            label: BudgetLabel::CapitalAlliance,
            when: Condition::contains("資本提携"),
            base_budget: yen(1_000_000),
        },
        BudgetRule {
            label: BudgetLabel::Completion,
            when: Condition::contains("完成"),
            base_budget: yen(1_000_000),
        },
        BudgetRule {
            label: BudgetLabel::Adopted,
            when: Condition::contains("採択"),
            base_budget: yen(1_000_000),
        },
        BudgetRule {
            label: BudgetLabel::UpwardRevision,
            when: Condition::contains("上方"),
            base_budget: yen(1_000_000),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn favorable() -> BudgetRule {
        BudgetRule {
            label: BudgetLabel::Favorable,
            when: Condition::contains("良好"),
            base_budget: dec!(1500000),
        }
    }

    #[test]
    fn test_size_floor_of_budget_over_cost() {
        let d = favorable().size(dec!(400000), dec!(1));
        assert_eq!(d.quantity, Shares(300));
        assert_eq!(d.label, BudgetLabel::Favorable);
        assert!(d.rationale.contains("adjusted_budget=1500000"));
    }

    #[test]
    fn test_size_applies_cap_multiplier_before_floor() {
        // 1,500,000 × 0.25 = 375,000 → 3 lots at 120,000
        let d = favorable().size(dec!(120000), dec!(0.25));
        assert_eq!(d.quantity, Shares(300));
    }

    #[test]
    fn test_size_adjusted_budget_is_floored() {
        // 1,250,001 × 0.3 = 375,000.3, floored to 375,000
        let rule = BudgetRule {
            base_budget: dec!(1250001),
            ..favorable()
        };
        let d = rule.size(dec!(375001), dec!(0.3));
        assert_eq!(d.quantity, Shares(100));
        assert!(d.rationale.contains("exceeds"));
    }

    #[test]
    fn test_unaffordable_is_one_lot() {
        let d = favorable().size(dec!(2000000), dec!(1));
        assert_eq!(d.quantity, Shares(100));
        let d = favorable().size(dec!(1), dec!(0));
        assert_eq!(d.quantity, Shares(100));
    }

    #[test]
    fn test_cost_equal_to_budget_is_one_lot() {
        let d = favorable().size(dec!(1500000), dec!(1));
        assert_eq!(d.quantity, Shares(100));
        assert!(!d.rationale.contains("exceeds"));
    }

    #[test]
    fn test_zero_cost_never_orders() {
        let d = favorable().size(dec!(0), dec!(1));
        assert_eq!(d.quantity, Shares::ZERO);
        assert!(!d.should_order());
    }

    #[test]
    fn test_default_rules_order() {
        let labels: Vec<_> = default_budget_rules().iter().map(|r| r.label).collect();
        assert_eq!(labels.first(), Some(&BudgetLabel::TreasuryAcquireAndCancel));
        assert_eq!(labels.last(), Some(&BudgetLabel::UpwardRevision));
        assert_eq!(labels.len(), 11);
    }
}
