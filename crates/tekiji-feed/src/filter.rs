//! Keyword and session filtering of disclosure rows.

use crate::config::FeedConfig;
use chrono::NaiveDate;
use std::collections::HashSet;
use tekiji_core::{Disclosure, DisclosureRow, SessionWindows};
use tracing::{debug, trace};

/// Turns raw listing rows into candidate disclosures.
#[derive(Debug, Clone)]
pub struct DisclosureFilter {
    include: Vec<String>,
    exclude: Vec<String>,
    sessions: SessionWindows,
}

impl DisclosureFilter {
    pub fn new(config: &FeedConfig, sessions: SessionWindows) -> Self {
        Self {
            include: config.include_keywords.clone(),
            exclude: config.exclude_keywords.clone(),
            sessions,
        }
    }

    /// Exclusions win over inclusions.
    pub fn headline_passes(&self, headline: &str) -> bool {
        if self.exclude.iter().any(|w| headline.contains(w.as_str())) {
            return false;
        }
        self.include.iter().any(|w| headline.contains(w.as_str()))
    }

    /// Keep rows that are today, inside a session window, parse cleanly and
    /// pass the keyword lists. The first row seen for a symbol wins.
    pub fn apply(&self, rows: &[DisclosureRow], today: NaiveDate) -> Vec<Disclosure> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();

        for row in rows {
            let disclosure = match Disclosure::from_row(row, today) {
                Ok(d) => d,
                Err(e) => {
                    trace!(error = %e, time = %row.time_text, code = %row.code_text, "Skipping unparseable row");
                    continue;
                }
            };
            if disclosure.disclosed_at.date() != today {
                continue;
            }
            if !self.sessions.contains(disclosure.disclosed_at.time()) {
                continue;
            }
            if !self.headline_passes(&disclosure.headline) {
                continue;
            }
            if !seen.insert(disclosure.symbol.clone()) {
                debug!(symbol = %disclosure.symbol, "Duplicate symbol in listing, keeping first row");
                continue;
            }
            kept.push(disclosure);
        }

        kept
    }
}
