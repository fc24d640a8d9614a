//! Wall-clock abstraction.
//!
//! All trading decisions are made in Japan Standard Time. Components take a
//! `Clock` so that freshness windows, session checks and order ages can be
//! tested against a fixed instant.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

/// Exchange time zone.
pub const JST: Tz = chrono_tz::Asia::Tokyo;

/// Timestamp in exchange time.
pub type JstDateTime = DateTime<Tz>;

/// Clock abstraction for testability.
pub trait Clock: Send + Sync {
    /// Current time in JST.
    fn now(&self) -> JstDateTime;
}

/// System clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> JstDateTime {
        Utc::now().with_timezone(&JST)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<JstDateTime>,
}

impl ManualClock {
    pub fn new(start: JstDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: JstDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> JstDateTime {
        *self.now.lock()
    }
}
