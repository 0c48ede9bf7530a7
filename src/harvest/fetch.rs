//! Payload retrieval.
//!
//! [`HttpFetcher`] is the production [`SourceFetcher`]: `http`/`https` via a
//! shared `reqwest` client and `file` via `tokio::fs`. [`SpecificationFetcher`]
//! layers a per-fetch timeout and the [`ParserRegistry`] on top of any
//! fetcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::harvest::formats::ParserRegistry;
use crate::model::Specification;
use crate::traits::{FetchError, SourceFetcher, SpecificationError};

/// Default timeout applied to every catalog or specification fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// HTTP / file fetcher
// ============================================================================

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher whose client enforces `connect_timeout` and an
    /// overall `request_timeout` per request.
    pub fn new(
        connect_timeout: Duration,
        request_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable {
                uri: uri.to_string(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        // The response (and its connection) is released when `bytes()`
        // consumes it, on success and on error alike.
        let body = response.bytes().await.map_err(|e| FetchError::Unreachable {
            uri: uri.to_string(),
            cause: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            self.fetch_http(uri).await
        } else if let Some(path) = uri.strip_prefix("file://") {
            tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                uri: uri.to_string(),
                source,
            })
        } else {
            Err(FetchError::UnsupportedScheme {
                uri: uri.to_string(),
            })
        }
    }
}

/// Runs `fetcher.fetch(uri)` under `limit`.
pub(crate) async fn fetch_with_timeout<F>(
    fetcher: &F,
    uri: &str,
    limit: Duration,
) -> Result<Vec<u8>, FetchError>
where
    F: SourceFetcher + ?Sized,
{
    timeout(limit, fetcher.fetch(uri))
        .await
        .map_err(|_| FetchError::Timeout {
            uri: uri.to_string(),
            timeout_secs: limit.as_secs(),
        })?
}

// ============================================================================
// Specification fetcher
// ============================================================================

/// Retrieves a specification payload and normalizes it via the parser table.
pub struct SpecificationFetcher<F: SourceFetcher> {
    fetcher: Arc<F>,
    registry: ParserRegistry,
    fetch_timeout: Duration,
}

impl<F: SourceFetcher> SpecificationFetcher<F> {
    pub fn new(fetcher: Arc<F>, registry: ParserRegistry) -> Self {
        Self {
            fetcher,
            registry,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// # Errors
    ///
    /// - [`SpecificationError::Fetch`] if the payload cannot be retrieved
    ///   (including timeout)
    /// - [`SpecificationError::UnsupportedFormat`] if no parser claims it
    /// - [`SpecificationError::Parse`] if the claiming parser rejects it
    #[instrument(skip(self))]
    pub async fn fetch(&self, spec_uri: &str) -> Result<Specification, SpecificationError> {
        let payload = fetch_with_timeout(self.fetcher.as_ref(), spec_uri, self.fetch_timeout).await?;
        debug!(bytes = payload.len(), "Fetched specification payload");
        self.registry.parse(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::testing::{MapFetcher, PETSTORE_V3};
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_and_parse_specification() {
        let fetcher = Arc::new(MapFetcher::new().with_body("http://x/spec.json", PETSTORE_V3));
        let specs = SpecificationFetcher::new(fetcher, ParserRegistry::default());

        let spec = specs.fetch("http://x/spec.json").await.unwrap();
        assert!(spec.formats.contains("application/json"));
    }

    #[tokio::test]
    async fn test_fetch_failure_kinds() {
        let fetcher = Arc::new(
            MapFetcher::new()
                .with_body("http://x/wsdl", "<definitions/>")
                .with_body("http://x/broken", r#"{"openapi": "3.0.0", "paths": 7}"#),
        );
        let specs = SpecificationFetcher::new(fetcher, ParserRegistry::default());

        assert!(matches!(
            specs.fetch("http://x/missing").await,
            Err(SpecificationError::Fetch(FetchError::Status { status: 404, .. }))
        ));
        assert!(matches!(
            specs.fetch("http://x/wsdl").await,
            Err(SpecificationError::UnsupportedFormat)
        ));
        assert!(matches!(
            specs.fetch("http://x/broken").await,
            Err(SpecificationError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_hanging_source_times_out() {
        let fetcher = Arc::new(MapFetcher::new().with_hang("http://slow/spec.json"));
        let specs = SpecificationFetcher::new(fetcher, ParserRegistry::default())
            .with_timeout(Duration::from_millis(50));

        let err = specs.fetch("http://slow/spec.json").await.unwrap_err();
        assert!(matches!(
            err,
            SpecificationError::Fetch(FetchError::Timeout { .. })
        ));
        assert!(err.to_string().contains("http://slow/spec.json"));
    }

    #[tokio::test]
    async fn test_http_fetcher_reads_file_uris() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let uri = format!("file://{}", file.path().display());

        let fetcher = HttpFetcher::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            "api-catalog-harvester-test",
        )
        .unwrap();
        assert_eq!(fetcher.fetch(&uri).await.unwrap(), b"hello");

        assert!(matches!(
            fetcher.fetch("file:///definitely/not/here.ttl").await,
            Err(FetchError::Io { .. })
        ));
        assert!(matches!(
            fetcher.fetch("ftp://example.org/catalog.ttl").await,
            Err(FetchError::UnsupportedScheme { .. })
        ));
    }
}
