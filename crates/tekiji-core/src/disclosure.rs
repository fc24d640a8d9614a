//! Timely-disclosure rows.
//!
//! The disclosure listing is scraped by an external service into
//! [`DisclosureRow`]s. Rows are turned into [`Disclosure`]s once their time
//! and code cells parse.

use crate::error::{CoreError, Result};
use crate::types::Symbol;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Raw row as produced by the disclosure source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRow {
    /// "HH:MM" for today's rows, "YYYY/MM/DD HH:MM" otherwise.
    #[serde(alias = "time")]
    pub time_text: String,
    #[serde(alias = "code")]
    pub code_text: String,
    #[serde(alias = "company", default)]
    pub company_name: String,
    #[serde(alias = "title")]
    pub headline: String,
}

/// Parsed disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub symbol: Symbol,
    pub company_name: String,
    pub headline: String,
    /// Local (JST) publication time, minute resolution.
    pub disclosed_at: NaiveDateTime,
}

/// Parse a listing time cell.
///
/// A bare "HH:MM" is taken to be on `today`.
pub fn parse_disclosure_time(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.contains('/') {
        NaiveDateTime::parse_from_str(text, "%Y/%m/%d %H:%M").ok()
    } else {
        NaiveTime::parse_from_str(text, "%H:%M")
            .ok()
            .map(|t| today.and_time(t))
    }
}

impl Disclosure {
    pub fn from_row(row: &DisclosureRow, today: NaiveDate) -> Result<Self> {
        let disclosed_at = parse_disclosure_time(&row.time_text, today)
            .ok_or_else(|| CoreError::InvalidTime(row.time_text.clone()))?;
        let symbol = Symbol::normalize(&row.code_text)?;
        Ok(Self {
            symbol,
            company_name: row.company_name.trim().to_string(),
            headline: row.headline.trim().to_string(),
            disclosed_at,
        })
    }

    /// Whether `now` is no more than `window_secs` after publication.
    ///
    /// A disclosure stamped in the future is not fresh.
    pub fn is_fresh_at(&self, now: NaiveDateTime, window_secs: i64) -> bool {
        let age = now.signed_duration_since(self.disclosed_at);
        age.num_milliseconds() >= 0 && age.num_milliseconds() <= window_secs * 1000
    }
}
