//! tekiji-bot: trades on timely corporate disclosures.
//!
//! Three independent processes share only the broker and files on disk:
//! - `entry`: per-minute disclosure scan and buy orders
//! - `reaper`: cancels unfilled buys past their age threshold
//! - `exit`: stop-loss rewrites and profit-target sells

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, Role};
pub use config::{AppConfig, PersistenceConfig};
pub use error::{AppError, AppResult};
