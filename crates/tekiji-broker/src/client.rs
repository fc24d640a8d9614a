//! kabu station REST client.

use crate::broker::Broker;
use crate::config::BrokerConfig;
use crate::credentials::ApiKey;
use crate::error::{BrokerError, BrokerResult};
use crate::wire::{
    self, BoardResponse, CancelOrderRequest, ErrorBody, OrderRecord, OrderResponse,
    PositionRecord, SendOrderRequest, SymbolResponse,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tekiji_core::{
    BoxFuture, LiveOrder, OrderAck, OrderIntent, OrderSide, Position, Price, Symbol, SymbolInfo,
};
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP client for the kabu station API.
pub struct KabuClient {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    config: BrokerConfig,
}

impl KabuClient {
    pub fn new(config: BrokerConfig, api_key: ApiKey) -> BrokerResult<Self> {
        config.validate().map_err(BrokerError::Config)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BrokerError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            config,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, self.api_key.expose())
    }

    fn board_path(&self, symbol: &Symbol) -> String {
        format!("{}@{}", symbol, self.config.exchange)
    }

    async fn send(&self, request: RequestBuilder, op: &'static str) -> BrokerResult<Response> {
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            warn!(op, error = %e, timeout = e.is_timeout(), "Broker request failed");
            BrokerError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => (err.code, err.message),
            Err(_) => (None, body.chars().take(200).collect()),
        };
        warn!(op, status = status.as_u16(), ?code, %message, "Broker returned error status");
        Err(BrokerError::Http {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, op: &'static str) -> BrokerResult<T> {
        let response = self.send(self.request(Method::GET, path), op).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BrokerError::Decode(format!("{op}: {}", e.without_url())))
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        op: &'static str,
    ) -> BrokerResult<T> {
        let response = self.send(self.request(method, path).json(body), op).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BrokerError::Decode(format!("{op}: {}", e.without_url())))
    }

    /// Order body for a margin entry or a closing sell.
    pub fn order_body(&self, intent: &OrderIntent) -> BrokerResult<SendOrderRequest> {
        if intent.qty.is_zero() {
            return Err(BrokerError::InvalidRequest(format!(
                "zero quantity for {}",
                intent.symbol
            )));
        }
        let price = intent
            .limit_price
            .to_i64()
            .filter(|p| *p > 0)
            .ok_or_else(|| {
                BrokerError::InvalidRequest(format!(
                    "limit price {} for {} is not a positive whole yen",
                    intent.limit_price, intent.symbol
                ))
            })?;

        let (cash_margin, deliv_type, close_position_order) = match intent.side {
            OrderSide::Buy => (wire::CASH_MARGIN_OPEN, 0, None),
            OrderSide::Sell => (wire::CASH_MARGIN_CLOSE, 2, Some(1)),
        };

        Ok(SendOrderRequest {
            symbol: intent.symbol.to_string(),
            exchange: self.config.exchange,
            security_type: 1,
            side: wire::side_code(intent.side),
            cash_margin,
            margin_trade_type: self.config.margin_trade_type,
            deliv_type,
            account_type: self.config.account_type,
            qty: intent.qty.0,
            close_position_order,
            front_order_type: wire::FRONT_ORDER_LIMIT,
            price,
            expire_day: 0,
        })
    }
}

impl Broker for KabuClient {
    fn quote<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, BrokerResult<Option<Price>>> {
        Box::pin(async move {
            let path = format!("/board/{}", self.board_path(symbol));
            let board: BoardResponse = self.get_json(&path, "board").await?;
            let quote = board.quote();
            debug!(%symbol, ?quote, "Fetched quote");
            Ok(quote)
        })
    }

    fn symbol_info<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, BrokerResult<SymbolInfo>> {
        Box::pin(async move {
            let path = format!("/symbol/{}?addinfo=true", self.board_path(symbol));
            let info: SymbolResponse = self.get_json(&path, "symbol").await?;
            Ok(info.into_symbol_info(symbol.clone()))
        })
    }

    fn submit_order<'a>(&'a self, intent: &'a OrderIntent) -> BoxFuture<'a, BrokerResult<OrderAck>> {
        Box::pin(async move {
            let body = self.order_body(intent)?;
            let response: OrderResponse = self
                .send_json(Method::POST, "/sendorder", &body, "sendorder")
                .await?;
            if response.result != 0 {
                warn!(symbol = %intent.symbol, result = response.result, "Order rejected");
                return Err(BrokerError::Rejected {
                    code: response.result,
                });
            }
            let order_id = response
                .order_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| BrokerError::Decode("sendorder: missing OrderId".to_string()))?;
            info!(
                symbol = %intent.symbol,
                side = %intent.side,
                price = %intent.limit_price,
                qty = intent.qty.0,
                %order_id,
                "Order accepted"
            );
            Ok(OrderAck { order_id })
        })
    }

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, BrokerResult<()>> {
        Box::pin(async move {
            let body = CancelOrderRequest { order_id };
            let response: OrderResponse = self
                .send_json(Method::PUT, "/cancelorder", &body, "cancelorder")
                .await?;
            if response.result != 0 {
                return Err(BrokerError::Rejected {
                    code: response.result,
                });
            }
            info!(order_id, "Cancel accepted");
            Ok(())
        })
    }

    fn orders(&self) -> BoxFuture<'_, BrokerResult<Vec<LiveOrder>>> {
        Box::pin(async move {
            let records: Vec<OrderRecord> = self.get_json("/orders?product=0", "orders").await?;
            Ok(records
                .into_iter()
                .filter_map(|rec| {
                    let id = rec.id.clone();
                    rec.into_live_order()
                        .map_err(|e| warn!(order_id = %id, error = %e, "Skipping unreadable order"))
                        .ok()
                })
                .collect())
        })
    }

    fn positions(&self) -> BoxFuture<'_, BrokerResult<Vec<Position>>> {
        Box::pin(async move {
            let records: Vec<PositionRecord> = self
                .get_json("/positions?product=0&addinfo=true", "positions")
                .await?;
            Ok(records
                .into_iter()
                .filter_map(|rec| {
                    let symbol = rec.symbol.clone();
                    rec.into_position()
                        .map_err(|e| warn!(%symbol, error = %e, "Skipping unreadable position"))
                        .ok()
                })
                .collect())
        })
    }
}
