//! Harvest queue: one intake channel, one sequential worker, two producers.
//!
//! Producers only enqueue; the worker drains tasks in FIFO order and runs
//! each catalog harvest to completion before taking the next. Pending tasks
//! are not deduplicated, a catalog enqueued twice is simply harvested twice.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::harvest::pipeline::HarvestOrchestrator;
use crate::model::{Catalog, HarvestStatus, HarvestTask};
use crate::traits::{CatalogStore, SourceFetcher, StoreError};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Harvest queue is closed")]
    Closed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Intake
// ============================================================================

/// Cloneable, non-blocking handle for enqueueing harvest tasks.
#[derive(Clone)]
pub struct HarvestQueue {
    tx: mpsc::UnboundedSender<HarvestTask>,
}

impl HarvestQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HarvestTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, task: HarvestTask) -> Result<(), QueueError> {
        self.tx.send(task).map_err(|_| QueueError::Closed)
    }

    /// Enqueues a harvest of `catalog`, typically after its source URI was
    /// created or changed.
    pub fn enqueue_harvest(&self, catalog: &Catalog) -> Result<(), QueueError> {
        self.enqueue(HarvestTask::for_catalog(catalog))
    }
}

// ============================================================================
// Producers
// ============================================================================

/// Enqueues one task per known catalog. Returns the number enqueued.
#[instrument(skip_all)]
pub async fn sweep(queue: &HarvestQueue, catalogs: &dyn CatalogStore) -> Result<usize, QueueError> {
    let all = catalogs.find_all().await?;
    for catalog in &all {
        queue.enqueue_harvest(catalog)?;
    }
    info!(catalogs = all.len(), "Enqueued full harvest sweep");
    Ok(all.len())
}

/// Runs [`sweep`] every `period`. The first sweep fires immediately when
/// `sweep_on_start` is set, otherwise after one full period.
pub fn spawn_periodic_sweep(
    queue: HarvestQueue,
    catalogs: Arc<dyn CatalogStore>,
    period: Duration,
    sweep_on_start: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = if sweep_on_start {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + period
        };
        let mut interval = tokio::time::interval_at(start, period);
        loop {
            interval.tick().await;
            match sweep(&queue, catalogs.as_ref()).await {
                Ok(_) => {}
                Err(QueueError::Closed) => {
                    info!("Harvest queue closed, stopping periodic sweep");
                    return;
                }
                Err(e) => error!("sweep error: {e}"),
            }
        }
    })
}

/// Creates or updates the catalog for `owner_id`, resets its status and
/// enqueues an immediate harvest.
pub async fn register_catalog(
    catalogs: &dyn CatalogStore,
    queue: &HarvestQueue,
    owner_id: &str,
    harvest_source_uri: &str,
) -> Result<Catalog, QueueError> {
    let mut catalog = catalogs
        .find_by_owner(owner_id)
        .await?
        .unwrap_or_else(|| Catalog::new(owner_id, harvest_source_uri));
    catalog.harvest_source_uri = harvest_source_uri.to_string();
    catalog.harvest_status = HarvestStatus::NotHarvested;

    let saved = catalogs.save(catalog).await?;
    queue.enqueue_harvest(&saved)?;
    Ok(saved)
}

// ============================================================================
// Worker
// ============================================================================

/// Single consumer of the harvest queue.
pub struct HarvestExecutor<F: SourceFetcher> {
    orchestrator: Arc<HarvestOrchestrator<F>>,
    catalogs: Arc<dyn CatalogStore>,
}

impl<F: SourceFetcher + 'static> HarvestExecutor<F> {
    pub fn new(orchestrator: Arc<HarvestOrchestrator<F>>, catalogs: Arc<dyn CatalogStore>) -> Self {
        Self {
            orchestrator,
            catalogs,
        }
    }

    /// Drains `rx` until every [`HarvestQueue`] handle is dropped. Returns
    /// the number of catalogs harvested.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<HarvestTask>) -> usize {
        let mut harvested = 0;
        while let Some(task) = rx.recv().await {
            if self.execute(task).await {
                harvested += 1;
            }
        }
        info!(harvested, "Harvest queue drained and closed");
        harvested
    }

    pub fn spawn(self, rx: mpsc::UnboundedReceiver<HarvestTask>) -> JoinHandle<usize> {
        tokio::spawn(self.run(rx))
    }

    /// Loads the current catalog for `task` and harvests it. Returns `false`
    /// if the catalog no longer exists or could not be loaded.
    #[instrument(skip(self))]
    async fn execute(&self, task: HarvestTask) -> bool {
        let catalog = match self.catalogs.find_by_owner(&task.owner_id).await {
            Ok(Some(catalog)) => catalog,
            Ok(None) => {
                warn!("Catalog no longer exists, skipping harvest task");
                return false;
            }
            Err(e) => {
                error!(error = %e, "Failed to load catalog for harvest task");
                return false;
            }
        };

        let report = self.orchestrator.harvest(catalog).await;
        info!(
            status = ?report.status,
            discovered = report.discovered,
            duration_ms = report.duration_ms,
            "Finished harvest task"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::testing::{catalog_ttl, MapFetcher, PETSTORE_V3};
    use crate::store::{InMemoryCatalogStore, InMemoryRegistrationStore};

    struct Setup {
        fetcher: Arc<MapFetcher>,
        catalogs: Arc<InMemoryCatalogStore>,
        registrations: Arc<InMemoryRegistrationStore>,
        executor: HarvestExecutor<MapFetcher>,
    }

    fn setup(fetcher: MapFetcher) -> Setup {
        let fetcher = Arc::new(fetcher);
        let catalogs = Arc::new(InMemoryCatalogStore::new());
        let registrations = Arc::new(InMemoryRegistrationStore::new());
        let orchestrator = Arc::new(HarvestOrchestrator::new(
            fetcher.clone(),
            catalogs.clone(),
            registrations.clone(),
        ));
        let executor = HarvestExecutor::new(orchestrator, catalogs.clone());
        Setup {
            fetcher,
            catalogs,
            registrations,
            executor,
        }
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_gone_fails() {
        let (queue, rx) = HarvestQueue::new();
        drop(rx);
        assert!(matches!(
            queue.enqueue(HarvestTask {
                owner_id: "x".to_string()
            }),
            Err(QueueError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_sweep_enqueues_every_catalog_in_order() {
        let catalogs = InMemoryCatalogStore::new();
        catalogs.save(Catalog::new("b", "http://b")).await.unwrap();
        catalogs.save(Catalog::new("a", "http://a")).await.unwrap();

        let (queue, mut rx) = HarvestQueue::new();
        assert_eq!(sweep(&queue, &catalogs).await.unwrap(), 2);

        assert_eq!(rx.recv().await.unwrap().owner_id, "a");
        assert_eq!(rx.recv().await.unwrap().owner_id, "b");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_worker_processes_tasks_without_dedup() {
        let s = setup(
            MapFetcher::new()
                .with_body("http://a/catalog.ttl", catalog_ttl(&["http://a/1.json"]))
                .with_body("http://a/1.json", PETSTORE_V3),
        );
        let (queue, rx) = HarvestQueue::new();

        let catalog = register_catalog(s.catalogs.as_ref(), &queue, "a", "http://a/catalog.ttl")
            .await
            .unwrap();
        assert_eq!(catalog.harvest_status, HarvestStatus::NotHarvested);
        queue.enqueue_harvest(&catalog).unwrap();
        queue
            .enqueue(HarvestTask {
                owner_id: "deleted".to_string(),
            })
            .unwrap();
        drop(queue);

        let harvested = s.executor.spawn(rx).await.unwrap();

        assert_eq!(harvested, 2);
        assert_eq!(
            s.fetcher
                .calls()
                .iter()
                .filter(|uri| uri.as_str() == "http://a/catalog.ttl")
                .count(),
            2
        );
        assert_eq!(
            s.catalogs.find_by_owner("a").await.unwrap().unwrap().harvest_status,
            HarvestStatus::Success
        );
        assert_eq!(s.registrations.len(), 1);
    }

    #[tokio::test]
    async fn test_register_catalog_updates_source_and_resets_status() {
        let catalogs = InMemoryCatalogStore::new();
        let mut existing = Catalog::new("a", "http://old/catalog.ttl");
        existing.harvest_status = HarvestStatus::error("boom");
        catalogs.save(existing).await.unwrap();

        let (queue, mut rx) = HarvestQueue::new();
        let saved = register_catalog(&catalogs, &queue, "a", "http://new/catalog.ttl")
            .await
            .unwrap();

        assert_eq!(saved.harvest_source_uri, "http://new/catalog.ttl");
        assert_eq!(saved.harvest_status, HarvestStatus::NotHarvested);
        assert_eq!(catalogs.find_by_owner("a").await.unwrap(), Some(saved));
        assert_eq!(rx.recv().await.unwrap().owner_id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_repeats() {
        let catalogs = Arc::new(InMemoryCatalogStore::new());
        catalogs.save(Catalog::new("a", "http://a")).await.unwrap();
        let (queue, mut rx) = HarvestQueue::new();

        let handle = spawn_periodic_sweep(queue, catalogs, Duration::from_secs(60), true);

        // Immediate sweep, then one per period.
        assert_eq!(rx.recv().await.unwrap().owner_id, "a");
        assert_eq!(rx.recv().await.unwrap().owner_id, "a");

        drop(rx);
        handle.await.unwrap();
    }
}
