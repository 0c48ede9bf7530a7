//! Swagger 2.0 JSON parser.
//!
//! Swagger declares response media types through `produces`, either on the
//! document (default) or per operation (override).

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::{
    summarize_operations, top_level_str, without_extensions, DocInfo, OperationFields, PathItem,
    SpecParser,
};
use crate::model::Specification;
use crate::traits::ParseError;

pub const PARSER: SpecParser = SpecParser {
    name: "swagger-v2-json",
    can_parse,
    parse,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerDocument {
    swagger: String,
    #[serde(default)]
    info: DocInfo,
    host: Option<String>,
    base_path: Option<String>,
    #[serde(default)]
    schemes: Vec<String>,
    #[serde(default)]
    produces: Vec<String>,
    #[serde(default, deserialize_with = "without_extensions")]
    paths: BTreeMap<String, PathItem<Operation>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    operation_id: Option<String>,
    summary: Option<String>,
    produces: Option<Vec<String>>,
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
    top_level_str(payload, "swagger").is_some_and(|version| version == "2.0")
}

pub fn parse(payload: &str) -> Result<Specification, ParseError> {
    let document: SwaggerDocument = serde_json::from_str(payload).map_err(|e| {
        ParseError::InvalidContent(format!("Error parsing spec as Swagger 2.0 json: {}", e))
    })?;

    let formats: BTreeSet<String> = document
        .paths
        .values()
        .flat_map(|item| item.operations())
        .flat_map(|(_, op)| op.produces.as_ref().unwrap_or(&document.produces))
        .cloned()
        .collect();

    let servers = match &document.host {
        Some(host) => {
            let base_path = document.base_path.as_deref().unwrap_or("");
            let schemes = if document.schemes.is_empty() {
                vec!["https".to_string()]
            } else {
                document.schemes.clone()
            };
            schemes
                .iter()
                .map(|scheme| format!("{}://{}{}", scheme, host, base_path))
                .collect()
        }
        None => Vec::new(),
    };

    Ok(Specification {
        source_format: PARSER.name.to_string(),
        operations: summarize_operations(&document.paths),
        formats,
        servers,
        spec_version: document.swagger,
        info: document.info.into(),
    })
}
