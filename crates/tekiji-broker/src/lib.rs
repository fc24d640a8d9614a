//! Brokerage access.
//!
//! The rest of the system talks to the broker only through the [`Broker`]
//! trait: quotes, static symbol info, order submission and cancellation,
//! and order/position snapshots. [`KabuClient`] implements it against the
//! kabu station REST API; [`MockBroker`] is an in-memory stand-in.

pub mod broker;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mock;
pub mod wire;

pub use broker::{Broker, DynBroker};
pub use client::KabuClient;
pub use config::BrokerConfig;
pub use credentials::{ApiKey, API_KEY_ENV_VARS};
pub use error::{BrokerError, BrokerResult};
pub use mock::MockBroker;
