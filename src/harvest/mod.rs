//! Harvest module - catalog fetch, specification parsing and registration
//! persistence.
//!
//! - **Formats**: ordered parser table via [`formats::ParserRegistry`]
//! - **Fetch**: [`fetch::HttpFetcher`] and [`fetch::SpecificationFetcher`]
//! - **Catalog**: Turtle catalog reading via [`catalog::CatalogFetcher`]
//! - **Registration**: per-URI merge-and-persist via [`registration::RegistrationBuilder`]
//! - **Pipeline**: end-to-end catalog harvest via [`pipeline::HarvestOrchestrator`]

pub mod catalog;
pub mod fetch;
pub mod formats;
pub mod pipeline;
pub mod registration;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use catalog::CatalogFetcher;
pub use fetch::{HttpFetcher, SpecificationFetcher, DEFAULT_FETCH_TIMEOUT};
pub use formats::{ParserRegistry, SpecParser};
pub use pipeline::{rollup_status, HarvestOrchestrator, HarvestReport};
pub use registration::RegistrationBuilder;
