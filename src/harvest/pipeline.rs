//! Catalog harvest orchestration.
//!
//! This module provides the [`HarvestOrchestrator`] that drives one catalog
//! through the harvest stages (Catalog fetch → per-URI Registration build →
//! status rollup → catalog persist) with:
//! - Async execution via `tokio`
//! - Configurable timeouts per fetch
//! - Structured logging via `tracing`
//! - Per-specification failure isolation

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::harvest::catalog::CatalogFetcher;
use crate::harvest::fetch::{SpecificationFetcher, DEFAULT_FETCH_TIMEOUT};
use crate::harvest::formats::ParserRegistry;
use crate::harvest::registration::RegistrationBuilder;
use crate::model::{Catalog, HarvestStatus};
use crate::traits::{CatalogStore, RegistrationNotifier, RegistrationStore, SourceFetcher};

// ============================================================================
// Report Types
// ============================================================================

/// Summary of one catalog harvest.
///
/// Informational only: the persisted catalog and registrations are the
/// source of truth.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub owner_id: String,

    /// Status written to the catalog
    pub status: HarvestStatus,

    /// Specification URIs listed by the catalog (duplicates included)
    pub discovered: usize,

    /// URIs whose registration ended in [`HarvestStatus::Success`]
    pub succeeded: usize,

    /// URIs whose registration ended in [`HarvestStatus::Error`], in order
    pub failed: Vec<String>,

    /// Wall-clock time for the whole harvest (milliseconds)
    pub duration_ms: u64,
}

// ============================================================================
// Status Rollup
// ============================================================================

/// Folds per-specification outcomes into the catalog status.
///
/// - no failures → `Success` (including a catalog that lists nothing)
/// - failures and at least one success → `PartialSuccess(failed)`
/// - failures only → `Error` with the failed URIs comma-joined
pub fn rollup_status(failed: &[String], at_least_one_success: bool) -> HarvestStatus {
    if failed.is_empty() {
        HarvestStatus::Success
    } else if at_least_one_success {
        HarvestStatus::PartialSuccess {
            failed: failed.to_vec(),
        }
    } else {
        HarvestStatus::error(failed.join(","))
    }
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`.
fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Harvests a single catalog end-to-end.
///
/// Each run recomputes the catalog status from that run's outcomes alone, so
/// repeated or duplicated runs converge on the same persisted state.
///
/// # Example
///
/// ```ignore
/// let orchestrator = HarvestOrchestrator::new(fetcher, catalogs, registrations)
///     .with_timeout(Duration::from_secs(30))
///     .with_notifier(Arc::new(notifier));
///
/// let report = orchestrator.harvest(catalog).await;
/// println!("{:?}", report.status);
/// ```
pub struct HarvestOrchestrator<F: SourceFetcher> {
    catalog_fetcher: CatalogFetcher<F>,
    registrations: RegistrationBuilder<F>,
    catalogs: Arc<dyn CatalogStore>,
}

impl<F: SourceFetcher> HarvestOrchestrator<F> {
    /// Creates an orchestrator with the default parser table and a
    /// 30 second fetch timeout.
    pub fn new(
        fetcher: Arc<F>,
        catalogs: Arc<dyn CatalogStore>,
        registrations: Arc<dyn RegistrationStore>,
    ) -> Self {
        Self::with_parsers(fetcher, catalogs, registrations, ParserRegistry::default())
    }

    pub fn with_parsers(
        fetcher: Arc<F>,
        catalogs: Arc<dyn CatalogStore>,
        registrations: Arc<dyn RegistrationStore>,
        parsers: ParserRegistry,
    ) -> Self {
        Self {
            catalog_fetcher: CatalogFetcher::new(fetcher.clone()),
            registrations: RegistrationBuilder::new(
                SpecificationFetcher::new(fetcher, parsers),
                registrations,
            ),
            catalogs,
        }
        .with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Sets the timeout applied to each individual fetch (the catalog
    /// document and every specification).
    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.catalog_fetcher = self.catalog_fetcher.with_timeout(fetch_timeout);
        self.registrations = self.registrations.with_timeout(fetch_timeout);
        self
    }

    /// Adds a downstream hook invoked once per processed registration.
    pub fn with_notifier(mut self, notifier: Arc<dyn RegistrationNotifier>) -> Self {
        self.registrations = self.registrations.with_notifier(notifier);
        self
    }

    /// Harvests `catalog` and persists its new status.
    ///
    /// A catalog document that cannot be fetched or parsed ends the run with
    /// `Error` and touches no registrations. Otherwise every listed URI is
    /// processed in document order; individual failures never stop the run.
    #[instrument(skip(self, catalog), fields(owner_id = %catalog.owner_id))]
    pub async fn harvest(&self, mut catalog: Catalog) -> HarvestReport {
        let start = Instant::now();
        info!(source = %catalog.harvest_source_uri, "Starting catalog harvest");

        // ====================================================================
        // Stage 1: Catalog document
        // ====================================================================

        let spec_uris = match self.catalog_fetcher.fetch(&catalog.harvest_source_uri).await {
            Ok(uris) => uris,
            Err(e) => {
                let message = format!(
                    "Failed while trying to fetch and parse API Catalog: {} {}",
                    catalog.harvest_source_uri, e
                );
                warn!("{}", message);
                catalog.harvest_status = HarvestStatus::error(message);
                let report = HarvestReport {
                    owner_id: catalog.owner_id.clone(),
                    status: catalog.harvest_status.clone(),
                    discovered: 0,
                    succeeded: 0,
                    failed: Vec::new(),
                    duration_ms: saturating_millis(start.elapsed()),
                };
                self.persist(catalog).await;
                return report;
            }
        };

        // ====================================================================
        // Stage 2: Registrations
        // ====================================================================

        let mut failed = Vec::new();
        let mut succeeded = 0usize;
        for spec_uri in &spec_uris {
            let registration = self
                .registrations
                .process_one(&catalog.owner_id, spec_uri)
                .await;
            match registration.harvest_status {
                HarvestStatus::Error { .. } => failed.push(spec_uri.clone()),
                HarvestStatus::Success => succeeded += 1,
                _ => {}
            }
        }

        // ====================================================================
        // Stage 3: Rollup
        // ====================================================================

        catalog.harvest_status = rollup_status(&failed, succeeded > 0);

        let duration_ms = saturating_millis(start.elapsed());
        if failed.is_empty() {
            info!(
                discovered = spec_uris.len(),
                duration_ms, "Catalog harvest done, success"
            );
        } else {
            info!(
                discovered = spec_uris.len(),
                failed = failed.len(),
                duration_ms,
                "Catalog harvest done, errors present"
            );
        }

        let report = HarvestReport {
            owner_id: catalog.owner_id.clone(),
            status: catalog.harvest_status.clone(),
            discovered: spec_uris.len(),
            succeeded,
            failed,
            duration_ms,
        };
        self.persist(catalog).await;
        report
    }

    async fn persist(&self, catalog: Catalog) {
        let owner_id = catalog.owner_id.clone();
        if let Err(e) = self.catalogs.save(catalog).await {
            warn!(owner_id = %owner_id, error = %e, "Failed to save catalog harvest status");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
