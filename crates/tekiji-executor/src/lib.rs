//! Entry side of the order lifecycle.
//!
//! # Key Components
//!
//! - [`EntryController`]: one classify-and-submit pass over the current
//!   disclosure listing, with per-day dedup.
//! - [`PrecisionScheduler`]: wakes at a fixed offset after every minute
//!   boundary and runs one cycle under a hard deadline.
//!
//! # Entry gates (in `EntryController::process`)
//!
//! 1. Already entered today       -> Skipped(AlreadyEntered)
//! 2. Older than freshness window -> Skipped(NotFresh)
//! 3. Outside session windows     -> Skipped(OutsideSession)
//! 4. No positive quote           -> Skipped(QuoteUnavailable)
//! 5. No market capitalization    -> Skipped(MarketCapUnavailable)
//! 6. Classifier quantity is zero -> Skipped(NoQuantity)
//! 7. (all passed)                -> submit, then mark entered

pub mod entry;
pub mod error;
pub mod scheduler;

pub use entry::{EntryConfig, EntryController, EntryOutcome, EntryState, SkipReason};
pub use error::{ExecutorError, ExecutorResult};
pub use scheduler::{next_target, CycleOutcome, CycleRunner, PrecisionScheduler, SchedulerConfig};
