//! Specification format parsers.
//!
//! Parsers are plain `(predicate, parse)` function pairs collected in a
//! [`ParserRegistry`]. The registry is evaluated in registration order and
//! the first parser whose predicate accepts the payload wins, so more
//! specific predicates must be registered before looser ones.
//!
//! Built-in parsers:
//! - [`openapi_v3`] - OpenAPI 3.x JSON documents
//! - [`swagger_v2`] - Swagger 2.0 JSON documents

pub mod openapi_v3;
pub mod swagger_v2;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::model::{ApiInfo, Contact, OperationSummary, Specification};
use crate::traits::{ParseError, SpecificationError};

// ============================================================================
// Registry
// ============================================================================

/// One entry of the parser table.
#[derive(Clone, Copy)]
pub struct SpecParser {
    /// Identifier recorded in [`Specification::source_format`]
    pub name: &'static str,

    /// Cheap structural check; must not fail
    pub can_parse: fn(&str) -> bool,

    /// Full normalization of the payload
    pub parse: fn(&str) -> Result<Specification, ParseError>,
}

impl std::fmt::Debug for SpecParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecParser").field("name", &self.name).finish()
    }
}

/// Ordered set of specification parsers.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    parsers: Vec<SpecParser>,
}

impl ParserRegistry {
    /// Creates a registry with no parsers; every payload is unsupported.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Appends a parser with the lowest priority so far.
    pub fn with_parser(mut self, parser: SpecParser) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn parser_names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name).collect()
    }

    /// Returns the first registered parser that claims `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecificationError::UnsupportedFormat`] if no parser does.
    pub fn select_parser(&self, payload: &str) -> Result<&SpecParser, SpecificationError> {
        self.parsers
            .iter()
            .find(|parser| (parser.can_parse)(payload))
            .ok_or(SpecificationError::UnsupportedFormat)
    }

    /// Decodes `payload` as UTF-8 (dropping a leading BOM) and runs it
    /// through the selected parser.
    pub fn parse(&self, payload: &[u8]) -> Result<Specification, SpecificationError> {
        let text = std::str::from_utf8(payload).map_err(ParseError::from)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let parser = self.select_parser(text)?;
        tracing::debug!(parser = parser.name, "Selected specification parser");
        Ok((parser.parse)(text)?)
    }
}

impl Default for ParserRegistry {
    /// OpenAPI v3 first, then Swagger 2.0.
    fn default() -> Self {
        Self::empty()
            .with_parser(openapi_v3::PARSER)
            .with_parser(swagger_v2::PARSER)
    }
}

// ============================================================================
// Shared document fragments
// ============================================================================

/// Reads the top-level string field `key` of a JSON object payload.
pub(crate) fn top_level_str(payload: &str, key: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value.get(key)?.as_str().map(str::to_string)
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct DocInfo {
    title: Option<String>,
    description: Option<String>,
    version: Option<String>,
    contact: Option<DocContact>,
    license: Option<DocLicense>,
}

#[derive(Debug, Deserialize)]
struct DocContact {
    name: Option<String>,
    email: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocLicense {
    name: Option<String>,
}

impl From<DocInfo> for ApiInfo {
    fn from(info: DocInfo) -> Self {
        ApiInfo {
            title: info.title,
            description: info.description,
            version: info.version,
            contact: info.contact.map(|c| Contact {
                name: c.name,
                email: c.email,
                url: c.url,
            }),
            license: info.license.and_then(|l| l.name),
        }
    }
}

/// Reads a JSON object as a map of `V`, dropping `x-` extension keys whose
/// values may be arbitrary JSON.
pub(crate) fn without_extensions<'de, D, V>(
    deserializer: D,
) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: DeserializeOwned,
{
    BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?
        .into_iter()
        .filter(|(key, _)| !key.starts_with("x-"))
        .map(|(key, value)| {
            serde_json::from_value(value)
                .map(|typed| (key, typed))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Path item shared by Swagger 2.0 and OpenAPI 3.x; only the operation
/// slots are read.
#[derive(Debug, Deserialize)]
pub(crate) struct PathItem<O> {
    get: Option<O>,
    put: Option<O>,
    post: Option<O>,
    delete: Option<O>,
    options: Option<O>,
    head: Option<O>,
    patch: Option<O>,
    trace: Option<O>,
}

impl<O> PathItem<O> {
    pub(crate) fn operations(&self) -> impl Iterator<Item = (&'static str, &O)> {
        [
            ("get", &self.get),
            ("put", &self.put),
            ("post", &self.post),
            ("delete", &self.delete),
            ("options", &self.options),
            ("head", &self.head),
            ("patch", &self.patch),
            ("trace", &self.trace),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }
}

/// Fields of an operation object common to both formats.
pub(crate) trait OperationFields {
    fn operation_id(&self) -> Option<&str>;
    fn summary(&self) -> Option<&str>;
}

pub(crate) fn summarize_operations<O: OperationFields>(
    paths: &BTreeMap<String, PathItem<O>>,
) -> Vec<OperationSummary> {
    paths
        .iter()
        .flat_map(|(path, item)| {
            item.operations().map(move |(method, op)| OperationSummary {
                path: path.clone(),
                method: method.to_string(),
                operation_id: op.operation_id().map(str::to_string),
                summary: op.summary().map(str::to_string),
            })
        })
        .collect()
}
