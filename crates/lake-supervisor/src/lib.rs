//! lake-supervisor — assembles config, fetcher, restarter and scheduler.
//!
//! The binary in `main.rs` is a thin CLI over these functions so the whole
//! wiring can be exercised from integration tests.

use std::path::Path;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};

use lake_core::{MetricSample, RawConfig, SupervisorConfig};
use lake_health::{MonitorStats, Scheduler, StallMonitor};
use lake_probe::{MetricFetcher, MetricSource};
use lake_restart::ContainerRestarter;

/// Values given on the command line; they beat both file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub indexer_url: Option<String>,
    pub container: Option<String>,
}

/// Load the config file (optional), then environment, then CLI overrides.
pub fn load_config(path: &Path, overrides: &Overrides) -> anyhow::Result<SupervisorConfig> {
    let mut raw = RawConfig::from_file(path)?;
    raw.apply_env(|key| std::env::var(key).ok());
    apply_overrides(&mut raw, overrides);
    Ok(raw.resolve()?)
}

fn apply_overrides(raw: &mut RawConfig, overrides: &Overrides) {
    if let Some(url) = &overrides.indexer_url {
        raw.indexer_url = Some(url.clone());
    }
    if let Some(container) = &overrides.container {
        raw.container_name = Some(container.clone());
    }
}

/// Build the scheduler for `config`.
pub fn build_scheduler(
    config: &SupervisorConfig,
) -> anyhow::Result<Scheduler<MetricFetcher, ContainerRestarter>> {
    let fetcher = MetricFetcher::from_config(config).context("invalid indexerURL")?;
    let restarter = ContainerRestarter::from_config(config);
    if config.container_name.trim().is_empty() {
        warn!("containerName is empty: stalls will be reported but the container cannot be restarted");
    }

    let monitor = StallMonitor::new(fetcher, restarter, config.stall_timeout);
    Ok(Scheduler::new(
        monitor,
        config.query_interval,
        config.restart_sleep,
    ))
}

/// Run the watchdog until `shutdown` fires.
pub async fn run(
    config: &SupervisorConfig,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<MonitorStats> {
    info!("starting lake-supervisor");
    info!(url = %config.indexer_url, metric = %config.metric_name, "indexer");
    info!(
        query_interval = ?config.query_interval,
        stall_timeout = ?config.stall_timeout,
        restart_sleep = ?config.restart_sleep,
        "timing"
    );
    info!(container = %config.container_name, command = ?config.restart_command, "restart target");

    let scheduler = build_scheduler(config)?;
    let monitor = scheduler.run(shutdown).await;
    Ok(monitor.stats())
}

/// Fetch the height once.
pub async fn probe(config: &SupervisorConfig) -> anyhow::Result<MetricSample> {
    let fetcher = MetricFetcher::from_config(config).context("invalid indexerURL")?;
    let sample = fetcher
        .fetch()
        .await
        .with_context(|| format!("failed to fetch {} from {}", config.metric_name, config.indexer_url))?;
    Ok(sample)
}
