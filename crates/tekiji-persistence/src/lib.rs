//! On-disk state shared between the entry, reaper and exit processes.
//!
//! - [`DailyLedger`]: date-keyed symbol sets guarded by a lock file and
//!   replaced atomically, so a restart on the same day never re-enters a
//!   symbol.
//! - [`AuditLog`]: append-only JSON Lines records of purchases, order
//!   submissions and cancellations, one file per kind per day.

pub mod audit;
pub mod error;
pub mod ledger;
pub mod records;

pub use audit::{read_purchase_labels, AuditLog, AuditRecord};
pub use error::{PersistenceError, PersistenceResult};
pub use ledger::DailyLedger;
pub use records::{
    CancelReason, CancellationRecord, OrderReason, PurchaseRecord, SubmissionRecord,
};
