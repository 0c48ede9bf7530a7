//! # API Catalog Harvester CLI
//!
//! ```bash
//! api-catalog-harvester --config ./harvester.toml harvest   # one-shot, prints JSON
//! api-catalog-harvester --config ./harvester.toml run       # worker + periodic sweep
//! ```
//!
//! Catalogs are read from the `[[catalogs]]` section of the config file and
//! kept in memory for the lifetime of the process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use api_catalog_harvester::config::{load_config, Config};
use api_catalog_harvester::harvest::{HarvestOrchestrator, HttpFetcher};
use api_catalog_harvester::store::{InMemoryCatalogStore, InMemoryRegistrationStore};
use api_catalog_harvester::{
    register_catalog, spawn_periodic_sweep, Catalog, CatalogStore, ChannelNotifier,
    HarvestExecutor, HarvestQueue,
};

/// Harvests DCAT API catalogs into normalized API registrations.
#[derive(Parser)]
#[command(name = "api-catalog-harvester", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "./harvester.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every configured catalog once and print the resulting state
    Harvest,
    /// Run the harvest worker and periodic sweep until Ctrl-C
    Run,
}

struct Runtime {
    catalogs: Arc<InMemoryCatalogStore>,
    registrations: Arc<InMemoryRegistrationStore>,
    executor: HarvestExecutor<HttpFetcher>,
}

fn build_runtime(config: &Config) -> Result<Runtime> {
    let fetcher = Arc::new(
        HttpFetcher::new(
            config.harvest.connect_timeout(),
            config.harvest.fetch_timeout(),
            &config.harvest.user_agent,
        )
        .context("Failed to build HTTP client")?,
    );
    let catalogs = Arc::new(InMemoryCatalogStore::new());
    let registrations = Arc::new(InMemoryRegistrationStore::new());

    let (notifier, mut notifications) = ChannelNotifier::new();
    tokio::spawn(async move {
        while let Some(id) = notifications.recv().await {
            debug!(registration_id = %id, "Registration ready for downstream processing");
        }
    });

    let orchestrator = Arc::new(
        HarvestOrchestrator::new(fetcher, catalogs.clone(), registrations.clone())
            .with_timeout(config.harvest.fetch_timeout())
            .with_notifier(Arc::new(notifier)),
    );
    let executor = HarvestExecutor::new(orchestrator, catalogs.clone());

    Ok(Runtime {
        catalogs,
        registrations,
        executor,
    })
}

async fn harvest_once(config: &Config) -> Result<()> {
    let runtime = build_runtime(config)?;
    let (queue, rx) = HarvestQueue::new();

    for catalog in &config.catalogs {
        register_catalog(
            runtime.catalogs.as_ref(),
            &queue,
            &catalog.owner_id,
            &catalog.harvest_source_uri,
        )
        .await?;
    }
    drop(queue);

    let harvested = runtime.executor.spawn(rx).await?;
    info!(harvested, "One-shot harvest finished");

    let output = serde_json::json!({
        "catalogs": runtime.catalogs.find_all().await?,
        "registrations": runtime.registrations.all(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_forever(config: &Config) -> Result<()> {
    let runtime = build_runtime(config)?;
    let (queue, rx) = HarvestQueue::new();

    for catalog in &config.catalogs {
        runtime
            .catalogs
            .save(Catalog::new(&catalog.owner_id, &catalog.harvest_source_uri))
            .await?;
    }

    let worker = runtime.executor.spawn(rx);
    let sweeper = spawn_periodic_sweep(
        queue,
        runtime.catalogs.clone(),
        config.harvest.sweep_interval(),
        config.harvest.sweep_on_start,
    );
    info!(
        catalogs = config.catalogs.len(),
        interval_secs = config.harvest.sweep_interval_secs,
        "Harvester running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    sweeper.abort();
    worker.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Harvest => harvest_once(&config).await,
        Commands::Run => run_forever(&config).await,
    }
}
