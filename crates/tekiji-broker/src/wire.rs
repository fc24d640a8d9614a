//! kabu station REST wire types.
//!
//! Field names follow the API's PascalCase JSON. Conversions into core types
//! live here so the client stays a thin transport.

use crate::error::{BrokerError, BrokerResult};
use chrono::DateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tekiji_core::{
    DetailKind, FillDetail, LiveOrder, OrderSide, OrderState, Position, Price, Shares, Symbol,
    SymbolInfo,
};

/// Side codes.
pub const SIDE_SELL: &str = "1";
pub const SIDE_BUY: &str = "2";

/// Order `State` value for a finished order.
pub const STATE_DONE: i32 = 5;

/// Detail `RecType` values.
pub const REC_EXPIRED: i32 = 3;
pub const REC_CANCELLED: i32 = 6;
pub const REC_LAPSED: i32 = 7;
pub const REC_EXECUTION: i32 = 8;

/// `CashMargin`: 2 = new margin position, 3 = close.
pub const CASH_MARGIN_OPEN: u8 = 2;
pub const CASH_MARGIN_CLOSE: u8 = 3;

/// `FrontOrderType` 20 = limit.
pub const FRONT_ORDER_LIMIT: u8 = 20;

pub fn side_code(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => SIDE_BUY,
        OrderSide::Sell => SIDE_SELL,
    }
}

pub fn parse_side(code: &str) -> BrokerResult<OrderSide> {
    match code.trim() {
        SIDE_BUY => Ok(OrderSide::Buy),
        SIDE_SELL => Ok(OrderSide::Sell),
        other => Err(BrokerError::Decode(format!("unknown side code {other:?}"))),
    }
}

fn shares(value: Option<Decimal>) -> Shares {
    Shares(value.and_then(|v| v.trunc().to_u64()).unwrap_or(0))
}

fn price(value: Option<Decimal>) -> Option<Price> {
    value.map(Price::new).filter(Price::is_positive)
}

fn symbol(code: &str) -> BrokerResult<Symbol> {
    Symbol::normalize(code).map_err(|e| BrokerError::Decode(e.to_string()))
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// `GET /board/{symbol}@{exchange}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardResponse {
    #[serde(default)]
    pub current_price: Option<Decimal>,
}

impl BoardResponse {
    pub fn quote(&self) -> Option<Price> {
        price(self.current_price)
    }
}

/// `GET /symbol/{symbol}@{exchange}?addinfo=true`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SymbolResponse {
    #[serde(default)]
    pub symbol_name: Option<String>,
    #[serde(default)]
    pub total_market_value: Option<Decimal>,
}

impl SymbolResponse {
    pub fn into_symbol_info(self, symbol: Symbol) -> SymbolInfo {
        SymbolInfo {
            symbol,
            name: self.symbol_name,
            market_cap: self.total_market_value.filter(|v| v.is_sign_positive()),
        }
    }
}

/// `POST /sendorder` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendOrderRequest {
    pub symbol: String,
    pub exchange: u8,
    pub security_type: u8,
    pub side: &'static str,
    pub cash_margin: u8,
    pub margin_trade_type: u8,
    pub deliv_type: u8,
    pub account_type: u8,
    pub qty: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_position_order: Option<u8>,
    pub front_order_type: u8,
    pub price: i64,
    pub expire_day: u32,
}

/// `POST /sendorder` and `PUT /cancelorder` response.
#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    #[serde(rename = "Result")]
    pub result: i64,
    #[serde(rename = "OrderId", default)]
    pub order_id: Option<String>,
}

/// `PUT /cancelorder` body.
#[derive(Debug, Serialize)]
pub struct CancelOrderRequest<'a> {
    #[serde(rename = "OrderID")]
    pub order_id: &'a str,
}

/// One element of `GET /orders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderRecord {
    #[serde(rename = "ID")]
    pub id: String,
    pub state: i32,
    pub symbol: String,
    pub side: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub order_qty: Option<Decimal>,
    #[serde(default)]
    pub cum_qty: Option<Decimal>,
    #[serde(default)]
    pub recv_time: Option<String>,
    #[serde(default)]
    pub details: Vec<OrderDetailRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderDetailRecord {
    pub rec_type: i32,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub qty: Option<Decimal>,
}

impl OrderDetailRecord {
    fn into_fill_detail(self) -> FillDetail {
        let kind = match self.rec_type {
            REC_EXECUTION => DetailKind::Execution,
            REC_CANCELLED => DetailKind::Cancellation,
            REC_EXPIRED | REC_LAPSED => DetailKind::Expiry,
            _ => DetailKind::Other,
        };
        FillDetail {
            kind,
            price: price(self.price),
            qty: shares(self.qty),
        }
    }
}

impl OrderRecord {
    pub fn into_live_order(self) -> BrokerResult<LiveOrder> {
        let side = parse_side(&self.side)?;
        let symbol = symbol(&self.symbol)?;
        let order_qty = shares(self.order_qty);
        let cum_qty = shares(self.cum_qty);
        let details: Vec<FillDetail> = self
            .details
            .into_iter()
            .map(OrderDetailRecord::into_fill_detail)
            .collect();

        let state = if self.state != STATE_DONE {
            if cum_qty.is_zero() {
                OrderState::Accepted
            } else {
                OrderState::PartiallyFilled
            }
        } else if !order_qty.is_zero() && cum_qty >= order_qty {
            OrderState::Filled
        } else if details.iter().any(|d| d.kind == DetailKind::Expiry) {
            OrderState::Expired
        } else {
            OrderState::Cancelled
        };

        let received_at = self
            .recv_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t.trim()).ok());

        Ok(LiveOrder {
            order_id: self.id,
            symbol,
            side,
            state,
            price: price(self.price),
            order_qty,
            cum_qty,
            received_at,
            details,
        })
    }
}

/// One element of `GET /positions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PositionRecord {
    pub symbol: String,
    pub side: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub leaves_qty: Option<Decimal>,
}

impl PositionRecord {
    pub fn into_position(self) -> BrokerResult<Position> {
        let entry_price = price(self.price)
            .ok_or_else(|| BrokerError::Decode(format!("position {} has no entry price", self.symbol)))?;
        Ok(Position {
            symbol: symbol(&self.symbol)?,
            side: parse_side(&self.side)?,
            entry_price,
            current_price: price(self.current_price),
            leaves_qty: shares(self.leaves_qty),
        })
    }
}
