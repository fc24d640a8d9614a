//! Budget labels.
//!
//! A label names the classifier rule that sized an entry. It travels with
//! the purchase audit record so the exit side can pick a profit multiplier.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLabel {
    /// Treasury-stock acquisition together with cancellation.
    TreasuryAcquireAndCancel,
    /// Treasury-stock cancellation.
    TreasuryCancel,
    /// Treasury-stock acquisition.
    TreasuryAcquire,
    /// Upward revision with a dividend increase.
    UpwardRevisionWithDividend,
    Favorable,
    /// New, introduced or resumed shareholder benefit.
    ShareholderBenefit,
    BusinessAlliance,
    CapitalAlliance,
    Completion,
    Adopted,
    /// Upward revision without a dividend increase.
    UpwardRevision,
    Unmatched,
}

impl BudgetLabel {
    /// Display name as used in audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TreasuryAcquireAndCancel => "自己株式取得 + 消却",
            Self::TreasuryCancel => "自己株式の消却",
            Self::TreasuryAcquire => "自己株式取得系",
            Self::UpwardRevisionWithDividend => "上方修正 + 増配",
            Self::Favorable => "良好",
            Self::ShareholderBenefit => "優待(新設/導入/再開)",
            Self::BusinessAlliance => "業務提携",
            Self::CapitalAlliance => "資本提携",
            Self::Completion => "完成",
            Self::Adopted => "採択",
            Self::UpwardRevision => "上方修正(単独)",
            Self::Unmatched => "未該当",
        }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self, Self::Unmatched)
    }
}

impl fmt::Display for BudgetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
