//! OpenAPI 3.x JSON parser.
//!
//! Response media types are collected from every operation on every path.
//! Request body media types are deliberately not part of the format set:
//! discovery cares about what an API returns.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::{
    summarize_operations, top_level_str, without_extensions, DocInfo, OperationFields, PathItem,
    SpecParser,
};
use crate::model::Specification;
use crate::traits::ParseError;

pub const PARSER: SpecParser = SpecParser {
    name: "openapi-v3-json",
    can_parse,
    parse,
};

#[derive(Debug, Deserialize)]
struct OpenApiDocument {
    openapi: String,
    #[serde(default)]
    info: DocInfo,
    #[serde(default)]
    servers: Vec<Server>,
    #[serde(default, deserialize_with = "without_extensions")]
    paths: BTreeMap<String, PathItem<Operation>>,
}

#[derive(Debug, Deserialize)]
struct Server {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(rename = "operationId")]
    operation_id: Option<String>,
    summary: Option<String>,
    #[serde(default, deserialize_with = "without_extensions")]
    responses: BTreeMap<String, Response>,
}

/// Response object or `$ref`; a reference contributes no formats.
#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    content: BTreeMap<String, serde_json::Value>,
}

impl OperationFields for Operation {
    fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

pub fn can_parse(payload: &str) -> bool {
    top_level_str(payload, "openapi").is_some_and(|version| version.starts_with('3'))
}

pub fn parse(payload: &str) -> Result<Specification, ParseError> {
    let document: OpenApiDocument = serde_json::from_str(payload).map_err(|e| {
        ParseError::InvalidContent(format!("Error parsing spec as OpenApi v3 json: {}", e))
    })?;

    Ok(Specification {
        source_format: PARSER.name.to_string(),
        operations: summarize_operations(&document.paths),
        formats: response_formats(&document.paths),
        spec_version: document.openapi,
        info: document.info.into(),
        servers: document.servers.into_iter().map(|s| s.url).collect(),
    })
}

fn response_formats(paths: &BTreeMap<String, PathItem<Operation>>) -> BTreeSet<String> {
    paths
        .values()
        .flat_map(|item| item.operations())
        .flat_map(|(_, op)| op.responses.values())
        .flat_map(|response| response.content.keys().cloned())
        .collect()
}
