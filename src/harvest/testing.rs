//! Test doubles shared by the harvest unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::traits::{FetchError, RegistrationNotifier, SourceFetcher};

pub const PETSTORE_V3: &str = r#"{
    "openapi": "3.0.0",
    "info": {"title": "Petstore", "version": "1.0.0"},
    "paths": {
        "/pets": {
            "get": {"responses": {"200": {"content": {"application/json": {}}}}}
        }
    }
}"#;

pub const REGISTRY_V2: &str = r#"{
    "swagger": "2.0",
    "info": {"title": "Registry"},
    "produces": ["text/turtle"],
    "paths": {"/things": {"get": {"responses": {}}}}
}"#;

/// Builds a Turtle catalog listing `spec_uris` as `dcat:dataset` objects.
pub fn catalog_ttl(spec_uris: &[&str]) -> String {
    let mut ttl = String::from(
        "@prefix dcat: <http://www.w3.org/ns/dcat#> .\n\
         @prefix dct: <http://purl.org/dc/terms/> .\n\n\
         <http://example.org/catalog> a dcat:Catalog ;\n    dct:title \"Test catalog\"",
    );
    for uri in spec_uris {
        ttl.push_str(&format!(" ;\n    dcat:dataset <{}>", uri));
    }
    ttl.push_str(" .\n");
    ttl
}

enum Source {
    Body(Vec<u8>),
    Unreachable,
    Hang,
}

/// In-memory [`SourceFetcher`]; unknown URIs answer HTTP 404.
#[derive(Default)]
pub struct MapFetcher {
    sources: Mutex<HashMap<String, Source>>,
    calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, uri: &str, body: impl AsRef<[u8]>) -> Self {
        self.set_body(uri, body);
        self
    }

    pub fn with_unreachable(self, uri: &str) -> Self {
        self.sources
            .lock()
            .unwrap()
            .insert(uri.to_string(), Source::Unreachable);
        self
    }

    pub fn with_hang(self, uri: &str) -> Self {
        self.sources
            .lock()
            .unwrap()
            .insert(uri.to_string(), Source::Hang);
        self
    }

    pub fn set_body(&self, uri: &str, body: impl AsRef<[u8]>) {
        self.sources
            .lock()
            .unwrap()
            .insert(uri.to_string(), Source::Body(body.as_ref().to_vec()));
    }

    pub fn remove(&self, uri: &str) {
        self.sources.lock().unwrap().remove(uri);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for MapFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(uri.to_string());
        let entry = self.sources.lock().unwrap().get(uri).map(|source| match source {
            Source::Body(body) => Some(Ok(body.clone())),
            Source::Unreachable => Some(Err(FetchError::Unreachable {
                uri: uri.to_string(),
                cause: "connection refused".to_string(),
            })),
            Source::Hang => None,
        });
        match entry {
            Some(Some(result)) => result,
            Some(None) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(FetchError::Status {
                uri: uri.to_string(),
                status: 404,
            }),
        }
    }
}

/// Records every notified registration id.
#[derive(Default)]
pub struct RecordingNotifier {
    ids: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn ids(&self) -> Vec<String> {
        self.ids.lock().unwrap().clone()
    }
}

impl RegistrationNotifier for RecordingNotifier {
    fn notify(&self, registration_id: &str) {
        self.ids.lock().unwrap().push(registration_id.to_string());
    }
}
