//! Headline classification for entry sizing and pricing.
//!
//! Turns a disclosure headline plus broker data into:
//! - a budget tier and lot count (`Classifier::classify`)
//! - a price multiplier from the headline's material (`material_multiplier`)
//! - a budget multiplier and entry price offset from market capitalization
//!
//! Every cascade is an ordered table of `(condition, outcome)` rows evaluated
//! first-match-wins, so priority is configuration rather than control flow.

pub mod budget;
pub mod capitalization;
pub mod classifier;
pub mod config;
pub mod error;
pub mod rules;

pub use budget::{BudgetDecision, BudgetRule};
pub use capitalization::{TierRow, TierTable};
pub use classifier::Classifier;
pub use config::ClassifierConfig;
pub use error::{ClassifierError, ClassifierResult};
pub use rules::{Condition, MaterialRule};
