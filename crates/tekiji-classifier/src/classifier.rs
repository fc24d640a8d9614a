//! Headline classifier.

use crate::budget::{BudgetDecision, BudgetRule};
use crate::config::ClassifierConfig;
use crate::error::ClassifierResult;
use rust_decimal::Decimal;
use tracing::debug;

/// Evaluates the configured rule tables.
///
/// Pure: the same inputs always produce the same decision.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> ClassifierResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// First budget rule whose condition matches the headline.
    pub fn matching_rule(&self, headline: &str) -> Option<&BudgetRule> {
        self.config
            .budget_rules
            .iter()
            .find(|rule| rule.when.matches(headline))
    }

    /// Size an entry for `headline`.
    pub fn classify(
        &self,
        headline: &str,
        cost_per_lot: Decimal,
        cap_multiplier: Decimal,
    ) -> BudgetDecision {
        let decision = match self.matching_rule(headline) {
            Some(rule) => rule.size(cost_per_lot, cap_multiplier),
            None => BudgetDecision::unmatched(),
        };
        debug!(
            headline,
            %cost_per_lot,
            %cap_multiplier,
            label = %decision.label,
            qty = decision.quantity.0,
            "Classified headline"
        );
        decision
    }

    /// Price multiplier for the headline's material, 1 if none applies.
    pub fn material_multiplier(&self, headline: &str) -> Decimal {
        self.config
            .material_rules
            .iter()
            .find(|rule| rule.when.matches(headline))
            .map_or(Decimal::ONE, |rule| rule.multiplier)
    }

    pub fn capitalization_multiplier(&self, market_cap: Decimal) -> Decimal {
        self.config.budget_multiplier.lookup(market_cap)
    }

    pub fn entry_offset(&self, market_cap: Decimal) -> Decimal {
        self.config.entry_offset.lookup(market_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tekiji_core::{BudgetLabel, Shares};

    fn classify(headline: &str) -> BudgetDecision {
        Classifier::default().classify(headline, dec!(100000), dec!(1))
    }

    #[test]
    fn test_upward_revision_with_dividend_one_lot() {
        let d = Classifier::default().classify(
            "業績予想の上方修正及び増配に関するお知らせ",
            dec!(1000000),
            dec!(1.0),
        );
        assert_eq!(d.label, BudgetLabel::UpwardRevisionWithDividend);
        assert_eq!(d.quantity, Shares(100));
    }

    #[test]
    fn test_treasury_acquire_and_cancel_wins_over_cancel_phrase() {
        let d = classify("自己株式の取得及び自己株式の消却に関するお知らせ");
        assert_eq!(d.label, BudgetLabel::TreasuryAcquireAndCancel);
        assert_eq!(d.quantity, Shares(1500));
    }

    #[test]
    fn test_treasury_cancel_alone() {
        let d = classify("自己株式の消却に関するお知らせ");
        assert_eq!(d.label, BudgetLabel::TreasuryCancel);
        assert_eq!(d.quantity, Shares(1200));
    }

    #[test]
    fn test_treasury_acquire_alone() {
        let d = classify("自己株式取得に係る事項の決定に関するお知らせ");
        assert_eq!(d.label, BudgetLabel::TreasuryAcquire);
        assert_eq!(d.quantity, Shares(500));
    }

    #[test]
    fn test_priority_cascade() {
        assert_eq!(classify("業績は良好").label, BudgetLabel::Favorable);
        assert_eq!(
            classify("株主優待制度の新設に関するお知らせ").label,
            BudgetLabel::ShareholderBenefit
        );
        assert_eq!(classify("株主優待制度の変更").label, BudgetLabel::Unmatched);
        assert_eq!(classify("A社との業務提携").label, BudgetLabel::BusinessAlliance);
        assert_eq!(classify("B社との資本提携").label, BudgetLabel::CapitalAlliance);
        assert_eq!(classify("新工場完成のお知らせ").label, BudgetLabel::Completion);
        assert_eq!(classify("補助金採択のお知らせ").label, BudgetLabel::Adopted);
        assert_eq!(classify("業績予想の上方修正").label, BudgetLabel::UpwardRevision);
        // Favorable is checked before the alliance tiers.
        assert_eq!(classify("業務提携は良好").label, BudgetLabel::Favorable);
    }

    #[test]
    fn test_unmatched_is_zero() {
        let d = classify("定款一部変更のお知らせ");
        assert_eq!(d.label, BudgetLabel::Unmatched);
        assert_eq!(d.quantity, Shares::ZERO);
        assert!(!d.should_order());
    }

    #[test]
    fn test_minimum_lot_for_every_matched_tier() {
        let classifier = Classifier::default();
        for rule in &classifier.config().budget_rules {
            let headline = match &rule.label {
                BudgetLabel::ShareholderBenefit => "株主優待の導入".to_string(),
                BudgetLabel::UpwardRevisionWithDividend => "上方修正と増配".to_string(),
                BudgetLabel::TreasuryAcquireAndCancel => "自己株式取得と消却".to_string(),
                other => other.as_str().replace("(単独)", "").replace("系", ""),
            };
            let d = classifier.classify(&headline, dec!(100000000), dec!(1));
            assert_eq!(d.label, rule.label, "{headline}");
            assert_eq!(d.quantity, Shares(100), "{headline}");
        }
    }

    #[test]
    fn test_quantity_always_round_lot_multiple() {
        let classifier = Classifier::default();
        for cost in [dec!(1), dec!(333), dec!(99999), dec!(123456), dec!(1500001)] {
            for mult in [dec!(0.2), dec!(0.25), dec!(1), dec!(3), dec!(6)] {
                let d = classifier.classify("上方修正", cost, mult);
                assert!(d.quantity.is_round_lot_multiple());
                assert!(!d.quantity.is_zero());
            }
        }
    }

    #[test]
    fn test_material_multiplier() {
        let c = Classifier::default();
        assert_eq!(c.material_multiplier("上方修正及び増配"), dec!(1.03));
        assert_eq!(c.material_multiplier("資本提携"), dec!(1.03));
        assert_eq!(c.material_multiplier("株主優待の新設"), dec!(1));
        assert_eq!(c.material_multiplier("自己株式の取得"), dec!(1));
        // At most one bonus applies.
        assert_eq!(c.material_multiplier("良好な業務提携の完成"), dec!(1.03));
    }

    #[test]
    fn test_capitalization_lookups() {
        let c = Classifier::default();
        assert_eq!(c.capitalization_multiplier(dec!(2000000000000)), dec!(3));
        assert_eq!(c.entry_offset(dec!(50000000000)), dec!(1.01));
        assert_eq!(c.entry_offset(dec!(1000000000)), dec!(0.98));
    }
}
