//! Broker trait.

use crate::error::BrokerResult;
use std::sync::Arc;
use tekiji_core::{BoxFuture, LiveOrder, OrderAck, OrderIntent, Position, Price, Symbol, SymbolInfo};

/// Operations the trading loops need from the brokerage.
///
/// Implementations must be safe to share across tasks. Every call is a
/// single request; retries are the caller's business (usually "next poll").
pub trait Broker: Send + Sync {
    /// Current price, `None` if the board has no trade yet.
    fn quote<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, BrokerResult<Option<Price>>>;

    fn symbol_info<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, BrokerResult<SymbolInfo>>;

    fn submit_order<'a>(&'a self, intent: &'a OrderIntent) -> BoxFuture<'a, BrokerResult<OrderAck>>;

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, BrokerResult<()>>;

    fn orders(&self) -> BoxFuture<'_, BrokerResult<Vec<LiveOrder>>>;

    fn positions(&self) -> BoxFuture<'_, BrokerResult<Vec<Position>>>;
}

/// Arc wrapper for Broker trait objects.
pub type DynBroker = Arc<dyn Broker>;
