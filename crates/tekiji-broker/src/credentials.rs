//! API credential handling.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["TEKIJI_API_KEY", "KABUSAPI_KEY", "KABU_API_KEY"];

/// Broker API key.
///
/// `Debug` is redacted and the buffer is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// First non-empty value among [`API_KEY_ENV_VARS`].
    pub fn from_env() -> Option<Self> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .map(Self)
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
