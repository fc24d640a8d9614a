//! Broker connection configuration.

use serde::{Deserialize, Serialize};

/// kabu station connection and order-template settings.
///
/// The API key is not part of this struct; it only comes from the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 1 = Tokyo Stock Exchange.
    #[serde(default = "default_exchange")]
    pub exchange: u8,
    /// 2 = general, 4 = specific account.
    #[serde(default = "default_account_type")]
    pub account_type: u8,
    /// 1 = standard margin (制度信用).
    #[serde(default = "default_margin_trade_type")]
    pub margin_trade_type: u8,
}

fn default_base_url() -> String {
    "http://localhost:18080/kabusapi".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_exchange() -> u8 {
    1
}

fn default_account_type() -> u8 {
    4
}

fn default_margin_trade_type() -> u8 {
    1
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            exchange: default_exchange(),
            account_type: default_account_type(),
            margin_trade_type: default_margin_trade_type(),
        }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("broker.base_url {:?} is not an http(s) URL", self.base_url));
        }
        if self.request_timeout_ms == 0 {
            return Err("broker.request_timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}
