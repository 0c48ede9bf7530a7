//! Collaborator contracts and the error taxonomy shared by every stage.
//!
//! The harvest core talks to the outside world only through the traits in
//! this module: a [`SourceFetcher`] for raw payloads, the two stores, and
//! zero or more [`RegistrationNotifier`]s.

use crate::model::{Catalog, Registration};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Failure to retrieve a payload (or a catalog graph) from a source URI.
///
/// Every variant carries the URI that failed so the message can be persisted
/// as-is into a harvest status.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Host unreachable, connection reset, TLS failure, ...
    #[error("Failed to reach {uri}: {cause}")]
    Unreachable { uri: String, cause: String },

    /// The source answered with a non-success HTTP status
    #[error("Fetching {uri} returned HTTP {status}")]
    Status { uri: String, status: u16 },

    /// The fetch did not complete within the configured timeout
    #[error("Fetching {uri} timed out after {timeout_secs}s")]
    Timeout { uri: String, timeout_secs: u64 },

    /// Local I/O error (file:// sources)
    #[error("I/O error reading {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    /// Only http, https and file URIs can be fetched
    #[error("Unsupported URI scheme: {uri}")]
    UnsupportedScheme { uri: String },

    /// The catalog document is not a valid Turtle graph
    #[error("Malformed catalog graph at {uri}: {cause}")]
    MalformedGraph { uri: String, cause: String },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse content: {0}")]
    InvalidContent(String),
    #[error("Payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Anything that can go wrong turning one specification URI into a
/// [`Specification`](crate::model::Specification).
#[derive(Error, Debug)]
pub enum SpecificationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Unsupported specification format")]
    UnsupportedFormat,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend failure: {0}")]
    Backend(String),
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Retrieves the raw bytes behind a URI.
///
/// The returned buffer is fully read; implementations must not leak the
/// underlying connection or file handle on any exit path.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<Catalog>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Catalog>, StoreError>;

    async fn save(&self, catalog: Catalog) -> Result<Catalog, StoreError>;

    async fn delete(&self, catalog: &Catalog) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn find_by_owner_and_spec_uri(
        &self,
        owner_id: &str,
        spec_uri: &str,
    ) -> Result<Option<Registration>, StoreError>;

    /// Inserts or replaces the registration identified by
    /// `(owner_id, spec_uri)`.
    async fn save(&self, registration: Registration) -> Result<Registration, StoreError>;
}

/// Downstream hook invoked once per processed registration.
///
/// Fire-and-forget: implementations must return promptly and never fail the
/// harvest. Typical implementations hand the id to another queue.
///
/// Only ids of registrations that went through a save attempt are
/// announced; a failed store lookup produces no notification.
pub trait RegistrationNotifier: Send + Sync {
    fn notify(&self, registration_id: &str);
}

/// Forwards registration ids over an unbounded channel.
pub struct ChannelNotifier {
    tx: tokio::sync::mpsc::UnboundedSender<String>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RegistrationNotifier for ChannelNotifier {
    fn notify(&self, registration_id: &str) {
        if self.tx.send(registration_id.to_string()).is_err() {
            tracing::debug!(registration_id, "Notification receiver dropped");
        }
    }
}
