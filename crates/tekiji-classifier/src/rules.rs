//! Keyword conditions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Substring predicate over a headline.
///
/// Serialized externally tagged so tables read naturally in TOML:
/// `when = { all_of = [{ contains = "上方" }, { contains = "増配" }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Contains(String),
    AnyOf(Vec<String>),
    AllOf(Vec<Condition>),
}

impl Condition {
    pub fn contains(word: &str) -> Self {
        Self::Contains(word.to_string())
    }

    pub fn any_of(words: &[&str]) -> Self {
        Self::AnyOf(words.iter().map(|w| w.to_string()).collect())
    }

    pub fn all_of(parts: Vec<Condition>) -> Self {
        Self::AllOf(parts)
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Contains(word) => text.contains(word.as_str()),
            Self::AnyOf(words) => words.iter().any(|w| text.contains(w.as_str())),
            Self::AllOf(parts) => parts.iter().all(|c| c.matches(text)),
        }
    }

    /// An empty keyword or empty list would match everything or nothing.
    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            Self::Contains(word) => !word.is_empty(),
            Self::AnyOf(words) => !words.is_empty() && words.iter().all(|w| !w.is_empty()),
            Self::AllOf(parts) => !parts.is_empty() && parts.iter().all(Self::is_well_formed),
        }
    }
}

/// Treasury-stock acquisition phrases.
pub const TREASURY_PHRASES: &[&str] = &["自己株式取得", "自己株式の取得", "自己株式の買", "自己投資口"];

/// One row of the material price-multiplier table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRule {
    pub when: Condition,
    pub multiplier: Decimal,
}

pub fn default_material_rules() -> Vec<MaterialRule> {
    let bonus = Decimal::new(103, 2);
    [
        Condition::all_of(vec![Condition::contains("上方"), Condition::contains("増配")]),
        Condition::contains("良好"),
        Condition::contains("業務提携"),
        Condition::contains("資本提携"),
        Condition::contains("完成"),
        Condition::contains("採択"),
    ]
    .into_iter()
    .map(|when| MaterialRule {
        when,
        multiplier: bonus,
    })
    .collect()
}
