//! Catalog document retrieval.
//!
//! A catalog is a Turtle graph; every statement whose predicate is
//! `dcat:dataset` points at one API specification.

use std::sync::Arc;
use std::time::Duration;

use oxiri::Iri;
use rio_api::model::{Literal, Term};
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleError, TurtleParser};
use tracing::{debug, instrument};

use crate::harvest::fetch::{fetch_with_timeout, DEFAULT_FETCH_TIMEOUT};
use crate::traits::{FetchError, SourceFetcher};

/// Matched as a substring of the predicate IRI, so both the canonical
/// `http://www.w3.org/ns/dcat#dataset` and its https variant qualify.
const DATASET_PREDICATE: &str = "dcat#dataset";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub struct CatalogFetcher<F: SourceFetcher> {
    fetcher: Arc<F>,
    fetch_timeout: Duration,
}

impl<F: SourceFetcher> CatalogFetcher<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Fetches the catalog at `source_uri` and returns the specification
    /// URIs it lists, in document order, duplicates included.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the document cannot be retrieved within the
    /// timeout or is not a valid Turtle graph.
    #[instrument(skip(self))]
    pub async fn fetch(&self, source_uri: &str) -> Result<Vec<String>, FetchError> {
        let payload =
            fetch_with_timeout(self.fetcher.as_ref(), source_uri, self.fetch_timeout).await?;

        let uri = source_uri.to_string();
        let base_iri = uri.clone();
        let spec_uris =
            tokio::task::spawn_blocking(move || dataset_uris(&payload, Some(base_iri.as_str())))
                .await
                .map_err(|e| FetchError::MalformedGraph {
                    uri: uri.clone(),
                    cause: format!("Task join error: {}", e),
                })?
                .map_err(|e| FetchError::MalformedGraph {
                    uri,
                    cause: e.to_string(),
                })?;

        debug!(count = spec_uris.len(), "Discovered specification URIs");
        Ok(spec_uris)
    }
}

/// Extracts every `dcat:dataset` object from a Turtle document.
///
/// Relative IRIs resolve against `base_iri` (normally the catalog's own
/// URI); without a usable base they are a parse error. IRIs and literal
/// values are collected; blank nodes are skipped since they cannot be
/// fetched.
pub fn dataset_uris(payload: &[u8], base_iri: Option<&str>) -> Result<Vec<String>, TurtleError> {
    let payload = payload.strip_prefix(UTF8_BOM).unwrap_or(payload);
    let base_iri = base_iri.and_then(|base| Iri::parse(base.to_string()).ok());

    let mut uris = Vec::new();
    TurtleParser::new(payload, base_iri).parse_all(&mut |triple| -> Result<(), TurtleError> {
        if !triple.predicate.iri.contains(DATASET_PREDICATE) {
            return Ok(());
        }
        match triple.object {
            Term::NamedNode(node) => uris.push(node.iri.to_string()),
            Term::Literal(Literal::Simple { value })
            | Term::Literal(Literal::LanguageTaggedString { value, .. })
            | Term::Literal(Literal::Typed { value, .. }) => uris.push(value.to_string()),
            _ => debug!("Skipping non-IRI dataset object"),
        }
        Ok(())
    })?;
    Ok(uris)
}
