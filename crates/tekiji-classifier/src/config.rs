//! Classifier configuration.

use crate::budget::{default_budget_rules, BudgetRule};
use crate::capitalization::{default_budget_multiplier_table, default_entry_offset_table, TierTable};
use crate::error::{ClassifierError, ClassifierResult};
use crate::rules::{default_material_rules, MaterialRule};
use serde::{Deserialize, Serialize};

/// Rule tables driving entry sizing and pricing.
///
/// Every table is evaluated in declaration order; the first matching row
/// wins. Omitted tables fall back to the tuned defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_budget_rules")]
    pub budget_rules: Vec<BudgetRule>,
    #[serde(default = "default_material_rules")]
    pub material_rules: Vec<MaterialRule>,
    #[serde(default = "default_budget_multiplier_table")]
    pub budget_multiplier: TierTable,
    #[serde(default = "default_entry_offset_table")]
    pub entry_offset: TierTable,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            budget_rules: default_budget_rules(),
            material_rules: default_material_rules(),
            budget_multiplier: default_budget_multiplier_table(),
            entry_offset: default_entry_offset_table(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> ClassifierResult<()> {
        for (i, rule) in self.budget_rules.iter().enumerate() {
            if !rule.when.is_well_formed() {
                return Err(ClassifierError::ConfigError(format!(
                    "budget rule #{i} ({}) has an empty condition",
                    rule.label
                )));
            }
            if !rule.label.is_matched() {
                return Err(ClassifierError::ConfigError(format!(
                    "budget rule #{i} cannot use the unmatched label"
                )));
            }
            if rule.base_budget.is_sign_negative() {
                return Err(ClassifierError::ConfigError(format!(
                    "budget rule #{i} ({}) has a negative budget",
                    rule.label
                )));
            }
        }
        for (i, rule) in self.material_rules.iter().enumerate() {
            if !rule.when.is_well_formed() {
                return Err(ClassifierError::ConfigError(format!(
                    "material rule #{i} has an empty condition"
                )));
            }
            if !rule.multiplier.is_sign_positive() || rule.multiplier.is_zero() {
                return Err(ClassifierError::ConfigError(format!(
                    "material rule #{i} multiplier {} must be positive",
                    rule.multiplier
                )));
            }
        }
        self.budget_multiplier.validate("budget_multiplier")?;
        self.entry_offset.validate("entry_offset")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Condition;
    use rust_decimal_macros::dec;
    use tekiji_core::BudgetLabel;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ClassifierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: ClassifierConfig = toml::from_str("").unwrap();
        assert_eq!(config.budget_rules.len(), 11);
        assert_eq!(config.material_rules.len(), 6);
    }

    #[test]
    fn test_toml_rule_override() {
        let text = r#"
            [[budget_rules]]
            label = "favorable"
            base_budget = "2000000"
            when = { all_of = [{ contains = "業績" }, { any_of = ["良好", "好調"] }] }

            [budget_multiplier]
            below = "1"
            rows = []
        "#;
        let config: ClassifierConfig = toml::from_str(text).unwrap();
        assert_eq!(config.budget_rules.len(), 1);
        let rule = &config.budget_rules[0];
        assert_eq!(rule.label, BudgetLabel::Favorable);
        assert_eq!(rule.base_budget, dec!(2000000));
        assert!(rule.when.matches("業績好調のお知らせ"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_rules() {
        let mut config = ClassifierConfig::default();
        config.budget_rules[0].when = Condition::AnyOf(vec![]);
        assert!(config.validate().is_err());

        let mut config = ClassifierConfig::default();
        config.budget_rules[0].label = BudgetLabel::Unmatched;
        assert!(config.validate().is_err());

        let mut config = ClassifierConfig::default();
        config.material_rules[0].multiplier = dec!(0);
        assert!(config.validate().is_err());
    }
}
