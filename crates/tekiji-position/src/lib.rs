//! Post-entry order management.
//!
//! Everything here works from broker snapshots:
//! - [`StaleOrderReaper`]: cancels unfilled buys older than a threshold.
//! - [`plan_stop_loss`]: finds resting sells whose position breached its stop.
//! - [`plan_profit_exits`]: turns fully filled buys into profit-target sells.
//! - [`ExitController`]: one poll loop running stop-loss and profit exits.
//!
//! Planning is pure; the loops own broker I/O, audit logs and ledgers.

pub mod controller;
pub mod error;
pub mod exit;
pub mod reaper;
pub mod stop_loss;

pub use controller::{ExitConfig, ExitController, ExitTick};
pub use error::{PositionError, PositionResult};
pub use exit::{default_label_multipliers, plan_profit_exits, ProfitExit, ProfitTargetConfig};
pub use reaper::{select_stale, ReaperConfig, StaleOrder, StaleOrderReaper};
pub use stop_loss::{plan_stop_loss, StopLossAction, StopLossConfig};
