//! Disclosure sources.

use crate::config::SourceConfig;
use crate::error::{FeedError, FeedResult};
use parking_lot::Mutex;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tekiji_core::{BoxFuture, DisclosureRow};
use tracing::{debug, warn};

/// Yields the current disclosure listing, newest first.
pub trait DisclosureSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<DisclosureRow>>>;
}

pub type DynDisclosureSource = Arc<dyn DisclosureSource>;

/// Reads rows from an HTTP endpoint returning a JSON array.
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl DisclosureSource for HttpSource {
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<DisclosureRow>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| FeedError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                warn!(url = %self.url, status = status.as_u16(), "Disclosure source returned error status");
                return Err(FeedError::Http {
                    status: status.as_u16(),
                });
            }
            let rows: Vec<DisclosureRow> = response
                .json()
                .await
                .map_err(|e| FeedError::Decode(e.to_string()))?;
            debug!(rows = rows.len(), "Fetched disclosure rows");
            Ok(rows)
        })
    }
}

/// Reads rows from a JSON file.
///
/// A missing file means the scraper has not produced anything yet and
/// yields no rows.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DisclosureSource for FileSource {
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<DisclosureRow>>> {
        Box::pin(async move {
            let bytes = match tokio::fs::read(&self.path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Vec::new());
            }
            serde_json::from_slice(&bytes).map_err(|e| {
                FeedError::Decode(format!("{}: {e}", self.path.display()))
            })
        })
    }
}

/// Fixed rows, replaceable between fetches.
#[derive(Default)]
pub struct StaticSource {
    rows: Mutex<Vec<DisclosureRow>>,
}

impl StaticSource {
    pub fn new(rows: Vec<DisclosureRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn set_rows(&self, rows: Vec<DisclosureRow>) {
        *self.rows.lock() = rows;
    }
}

impl DisclosureSource for StaticSource {
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<DisclosureRow>>> {
        Box::pin(async move { Ok(self.rows.lock().clone()) })
    }
}

/// Build the configured source.
pub fn build_source(config: &SourceConfig) -> FeedResult<DynDisclosureSource> {
    Ok(match config {
        SourceConfig::Http { url, timeout_ms } => {
            Arc::new(HttpSource::new(url.clone(), Duration::from_millis(*timeout_ms))?)
        }
        SourceConfig::File { path } => Arc::new(FileSource::new(path.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/disclosures"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"time": "09:05", "code": "72030", "company": "トヨタ自動車", "title": "増配のお知らせ"}
            ])))
            .mount(&server)
            .await;

        let source =
            HttpSource::new(format!("{}/disclosures", server.uri()), Duration::from_secs(2)).unwrap();
        let rows = source.fetch().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code_text, "72030");
    }

    #[tokio::test]
    async fn test_http_source_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(FeedError::Http { status: 503 })
        ));
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.json");
        let source = FileSource::new(&path);
        assert!(source.fetch().await.unwrap().is_empty());

        std::fs::write(
            &path,
            r#"[{"time_text":"13:00","code_text":"6758","company_name":"ソニー","headline":"業務提携"}]"#,
        )
        .unwrap();
        assert_eq!(source.fetch().await.unwrap().len(), 1);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(source.fetch().await, Err(FeedError::Decode(_))));
    }
}
