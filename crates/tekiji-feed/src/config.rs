//! Feed configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where disclosure rows come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// JSON array of rows served by the scraper service.
    Http {
        url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// JSON array of rows rewritten in place by the scraper.
    File { path: PathBuf },
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Http {
            url: "http://localhost:8765/disclosures".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub source: SourceConfig,
    /// A headline must contain at least one of these.
    #[serde(default = "default_include_keywords")]
    pub include_keywords: Vec<String>,
    /// A headline containing any of these is dropped, even if included.
    #[serde(default = "default_exclude_keywords")]
    pub exclude_keywords: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn default_include_keywords() -> Vec<String> {
    words(&[
        "自己株式取得",
        "自己株式の取得",
        "自己株式の買",
        "自己投資口",
        "増配",
        "上方",
        "株主優待",
        "新設",
        "導入",
        "再開",
        "業務提携",
        "資本提携",
        "完成",
        "採択",
        "良好",
        "消却",
        "自己株式の消却",
    ])
}

fn default_exclude_keywords() -> Vec<String> {
    words(&[
        "終了", "結果", "状況", "訂正", "中止", "無配", "廃止", "下方", "見送", "損失", "業績目標",
        "補足", "減配", "解消", "完了", "一部変更",
    ])
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            include_keywords: default_include_keywords(),
            exclude_keywords: default_exclude_keywords(),
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.include_keywords.is_empty() || self.include_keywords.iter().any(|w| w.is_empty()) {
            return Err("feed.include_keywords must be non-empty keywords".to_string());
        }
        if self.exclude_keywords.iter().any(|w| w.is_empty()) {
            return Err("feed.exclude_keywords contains an empty keyword".to_string());
        }
        match &self.source {
            SourceConfig::Http { url, timeout_ms } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(format!("feed.source.url {url:?} is not an http(s) URL"));
                }
                if *timeout_ms == 0 {
                    return Err("feed.source.timeout_ms must be positive".to_string());
                }
            }
            SourceConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err("feed.source.path must not be empty".to_string());
                }
            }
        }
        Ok(())
    }
}
