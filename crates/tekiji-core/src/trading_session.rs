//! Trading session windows (JST).
//!
//! The morning and afternoon windows are slightly wider than the exchange's
//! continuous session so that disclosures published just before the open
//! and just after the close are still acted on.

use crate::error::{CoreError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// One inclusive time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// The daily set of windows in which entries are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindows {
    pub windows: Vec<SessionWindow>,
}

impl SessionWindows {
    #[must_use]
    pub fn contains(&self, t: NaiveTime) -> bool {
        self.windows.iter().any(|w| w.contains(t))
    }

    /// Windows must be non-empty, ordered and non-overlapping.
    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return Err(CoreError::InvalidConfig(
                "at least one session window is required".to_string(),
            ));
        }
        for w in &self.windows {
            if w.start > w.end {
                return Err(CoreError::InvalidConfig(format!(
                    "session window {}-{} ends before it starts",
                    w.start, w.end
                )));
            }
        }
        for pair in self.windows.windows(2) {
            if pair[0].end >= pair[1].start {
                return Err(CoreError::InvalidConfig(format!(
                    "session windows overlap or are out of order at {}",
                    pair[1].start
                )));
            }
        }
        Ok(())
    }
}

impl Default for SessionWindows {
    fn default() -> Self {
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        Self {
            windows: vec![
                SessionWindow::new(hm(8, 55), hm(11, 30)),
                SessionWindow::new(hm(12, 30), hm(15, 40)),
            ],
        }
    }
}
