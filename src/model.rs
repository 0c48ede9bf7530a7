use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of the most recent harvest attempt for a catalog or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HarvestStatus {
    #[default]
    NotHarvested,
    Success,
    PartialSuccess { failed: Vec<String> },
    Error { message: String },
}

impl HarvestStatus {
    pub fn error(message: impl Into<String>) -> Self {
        HarvestStatus::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HarvestStatus::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HarvestStatus::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub owner_id: String,
    pub harvest_source_uri: String,
    #[serde(default)]
    pub harvest_status: HarvestStatus,
}

impl Catalog {
    pub fn new(owner_id: impl Into<String>, harvest_source_uri: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            harvest_source_uri: harvest_source_uri.into(),
            harvest_status: HarvestStatus::NotHarvested,
        }
    }
}

/// A single API specification known to an owner.
///
/// `(owner_id, spec_uri)` is unique; `id` is assigned once on creation and
/// kept across re-harvests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub owner_id: String,
    pub spec_uri: String,
    pub specification: Option<Specification>,
    pub from_catalog: bool,
    pub formats: BTreeSet<String>,
    pub harvest_status: HarvestStatus,
}

impl Registration {
    pub fn new(owner_id: impl Into<String>, spec_uri: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            spec_uri: spec_uri.into(),
            specification: None,
            from_catalog: false,
            formats: BTreeSet::new(),
            harvest_status: HarvestStatus::NotHarvested,
        }
    }
}

/// Normalized API description produced by a format parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub source_format: String, // e.g., "openapi-v3-json"
    pub spec_version: String,
    pub info: ApiInfo,
    pub servers: Vec<String>,
    pub operations: Vec<OperationSummary>,
    /// Response media types declared across all operations
    pub formats: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub path: String,
    pub method: String, // lowercase, e.g., "get"
    pub operation_id: Option<String>,
    pub summary: Option<String>,
}

/// Queued unit of work: harvest the catalog owned by `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestTask {
    pub owner_id: String,
}

impl HarvestTask {
    pub fn for_catalog(catalog: &Catalog) -> Self {
        Self {
            owner_id: catalog.owner_id.clone(),
        }
    }
}
