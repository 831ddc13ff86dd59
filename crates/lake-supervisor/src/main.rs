//! lake-supervisor — watchdog for a NEAR Lake indexer.
//!
//! Polls the indexer's block-height metric and restarts its container when
//! the height stops moving.
//!
//! # Usage
//!
//! ```text
//! lake-supervisor run --config config/local.yaml
//! lake-supervisor probe --indexer-url http://localhost:3030
//! lake-supervisor config
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lake_core::config::DEFAULT_CONFIG_PATH;
use lake_supervisor::Overrides;

#[derive(Parser)]
#[command(
    name = "lake-supervisor",
    about = "Restarts a NEAR Lake indexer whose block height stalls",
    version
)]
struct Cli {
    /// YAML config file. A missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override `indexerURL`.
    #[arg(long, global = true)]
    indexer_url: Option<String>,

    /// Override `containerName`.
    #[arg(long, global = true)]
    container: Option<String>,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the indexer and restart it on stall (default).
    Run,
    /// Fetch the block height once and print it.
    Probe,
    /// Print the effective configuration as YAML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lake_supervisor=debug,lake_health=debug"));
    if cli.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let overrides = Overrides {
        indexer_url: cli.indexer_url,
        container: cli.container,
    };
    let config = lake_supervisor::load_config(&cli.config, &overrides)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                shutdown_signal().await;
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            });

            lake_supervisor::run(&config, shutdown_rx).await?;
            info!("lake-supervisor stopped");
        }
        Command::Probe => {
            let sample = lake_supervisor::probe(&config).await?;
            println!("{} ({})", sample.height, sample.source);
        }
        Command::Config => {
            print!("{}", config.to_yaml_string()?);
        }
    }

    Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
