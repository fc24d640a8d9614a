//! In-memory broker for tests and dry runs.

use crate::broker::Broker;
use crate::error::{BrokerError, BrokerResult};
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tekiji_core::{
    BoxFuture, FillDetail, LiveOrder, OrderAck, OrderIntent, OrderState, Position, Price, Symbol,
    SymbolInfo,
};

/// Broker double that records every submission and cancellation.
///
/// Submitted orders appear in `orders()` as `Accepted` until a test fills
/// or cancels them.
#[derive(Default)]
pub struct MockBroker {
    quotes: Mutex<HashMap<Symbol, Price>>,
    market_caps: Mutex<HashMap<Symbol, rust_decimal::Decimal>>,
    orders: Mutex<Vec<LiveOrder>>,
    positions: Mutex<Vec<Position>>,
    submitted: Mutex<Vec<OrderIntent>>,
    cancelled: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    received_at: Mutex<Option<DateTime<FixedOffset>>>,
    next_id: AtomicU64,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quote(&self, symbol: &Symbol, price: Price) {
        self.quotes.lock().insert(symbol.clone(), price);
    }

    pub fn set_market_cap(&self, symbol: &Symbol, cap: rust_decimal::Decimal) {
        self.market_caps.lock().insert(symbol.clone(), cap);
    }

    pub fn set_orders(&self, orders: Vec<LiveOrder>) {
        *self.orders.lock() = orders;
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        *self.positions.lock() = positions;
    }

    /// Receipt time stamped on orders submitted from now on.
    pub fn set_received_at(&self, at: Option<DateTime<FixedOffset>>) {
        *self.received_at.lock() = at;
    }

    /// Make `op` (a `Broker` method name) fail with HTTP 500 until [`MockBroker::recover`].
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().remove(op);
    }

    pub fn submitted(&self) -> Vec<OrderIntent> {
        self.submitted.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    pub fn live_orders(&self) -> Vec<LiveOrder> {
        self.orders.lock().clone()
    }

    /// Fill an order completely at `price`.
    pub fn fill(&self, order_id: &str, price: Price) {
        let mut orders = self.orders.lock();
        if let Some(order) = orders.iter_mut().find(|o| o.order_id == order_id) {
            order.details.push(FillDetail::execution(
                price,
                order.order_qty.saturating_sub(order.cum_qty),
            ));
            order.cum_qty = order.order_qty;
            order.state = OrderState::Filled;
        }
    }

    fn check(&self, op: &'static str) -> BrokerResult<()> {
        if self.failing.lock().contains(op) {
            return Err(BrokerError::Http {
                status: 500,
                code: None,
                message: format!("injected {op} failure"),
            });
        }
        Ok(())
    }
}

impl Broker for MockBroker {
    fn quote<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, BrokerResult<Option<Price>>> {
        Box::pin(async move {
            self.check("quote")?;
            Ok(self.quotes.lock().get(symbol).copied())
        })
    }

    fn symbol_info<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, BrokerResult<SymbolInfo>> {
        Box::pin(async move {
            self.check("symbol_info")?;
            Ok(SymbolInfo {
                symbol: symbol.clone(),
                name: None,
                market_cap: self.market_caps.lock().get(symbol).copied(),
            })
        })
    }

    fn submit_order<'a>(&'a self, intent: &'a OrderIntent) -> BoxFuture<'a, BrokerResult<OrderAck>> {
        Box::pin(async move {
            self.check("submit_order")?;
            let order_id = format!("MOCK{:08}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            self.submitted.lock().push(intent.clone());
            self.orders.lock().push(LiveOrder {
                order_id: order_id.clone(),
                symbol: intent.symbol.clone(),
                side: intent.side,
                state: OrderState::Accepted,
                price: Some(intent.limit_price),
                order_qty: intent.qty,
                cum_qty: tekiji_core::Shares::ZERO,
                received_at: *self.received_at.lock(),
                details: Vec::new(),
            });
            Ok(OrderAck { order_id })
        })
    }

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, BrokerResult<()>> {
        Box::pin(async move {
            self.check("cancel_order")?;
            self.cancelled.lock().push(order_id.to_string());
            let mut orders = self.orders.lock();
            match orders.iter_mut().find(|o| o.order_id == order_id) {
                Some(order) if order.state.is_open() => {
                    order.state = OrderState::Cancelled;
                    Ok(())
                }
                _ => Err(BrokerError::Http {
                    status: 500,
                    code: Some(43),
                    message: format!("order {order_id} is not cancellable"),
                }),
            }
        })
    }

    fn orders(&self) -> BoxFuture<'_, BrokerResult<Vec<LiveOrder>>> {
        Box::pin(async move {
            self.check("orders")?;
            Ok(self.orders.lock().clone())
        })
    }

    fn positions(&self) -> BoxFuture<'_, BrokerResult<Vec<Position>>> {
        Box::pin(async move {
            self.check("positions")?;
            Ok(self.positions.lock().clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tekiji_core::Shares;

    #[tokio::test]
    async fn test_submit_then_cancel() {
        let broker = MockBroker::new();
        let intent = OrderIntent::buy(Symbol::new("7203"), Price::new(dec!(2510)), Shares(100));
        let ack = broker.submit_order(&intent).await.unwrap();
        assert_eq!(broker.submitted(), vec![intent]);

        broker.cancel_order(&ack.order_id).await.unwrap();
        assert_eq!(broker.live_orders()[0].state, OrderState::Cancelled);
        // A second cancel of a terminal order fails like the real API.
        assert!(broker.cancel_order(&ack.order_id).await.is_err());
        assert_eq!(broker.cancelled().len(), 2);
    }

    #[tokio::test]
    async fn test_fill_and_failure_injection() {
        let broker = MockBroker::new();
        let intent = OrderIntent::buy(Symbol::new("7203"), Price::new(dec!(2510)), Shares(200));
        let ack = broker.submit_order(&intent).await.unwrap();
        broker.fill(&ack.order_id, Price::new(dec!(2505)));
        let order = &broker.orders().await.unwrap()[0];
        assert!(order.is_fully_filled());
        assert_eq!(order.weighted_fill_price(), Some(Price::new(dec!(2505))));

        broker.fail("orders");
        assert!(broker.orders().await.is_err());
        broker.recover("orders");
        assert!(broker.orders().await.is_ok());
    }
}
