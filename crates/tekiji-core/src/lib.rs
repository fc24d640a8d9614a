//! Core domain types for the disclosure-driven trading bot.
//!
//! This crate provides fundamental types used throughout the trading system:
//! - `Price`, `Shares`: Precision-safe numeric types
//! - `Symbol`, `Disclosure`: Instrument codes and parsed disclosure rows
//! - `OrderSide`, `OrderIntent`, `LiveOrder`, `Position`: Order lifecycle types
//! - `quantize`: Exchange tick-table price quantization
//! - `SessionWindows`, `Clock`: JST session and time handling

pub mod clock;
pub mod decimal;
pub mod disclosure;
pub mod error;
pub mod execution;
pub mod label;
pub mod order;
pub mod tick;
pub mod trading_session;
pub mod types;

pub use clock::{Clock, JstDateTime, ManualClock, SystemClock, JST};
pub use decimal::{Price, Shares, ROUND_LOT};
pub use disclosure::{parse_disclosure_time, Disclosure, DisclosureRow};
pub use error::{CoreError, Result};
pub use execution::{DetailKind, FillDetail, LiveOrder, OrderState};
pub use label::BudgetLabel;
pub use order::{OrderAck, OrderIntent, OrderSide};
pub use tick::{quantize, tick_size};
pub use trading_session::{SessionWindow, SessionWindows};
pub use types::{Position, Symbol, SymbolInfo};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
