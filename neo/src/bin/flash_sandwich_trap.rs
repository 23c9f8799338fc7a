//! Flash Sandwich Trap - command line runner
//!
//! Replays recorded blocks through the detector and prints every alert as
//! JSON on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Built-in two-block demo
//! cargo run --bin flash-sandwich-trap -- --demo
//!
//! # Recorded blocks, optional config file
//! cargo run --bin flash-sandwich-trap -- \
//!   --config trap.toml \
//!   --fixture neo/fixtures/sandwich.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use morpheus::{ChainDataSource, ReplaySource};
use neo::{demo, Monitor};
use tokio::sync::mpsc;
use tracing::info;
use trap_config::TrapConfig;
use trap_metrics::TrapMetrics;

#[derive(Parser, Debug)]
#[command(name = "flash-sandwich-trap")]
#[command(about = "Detects flash loan sandwich attacks in recorded blocks", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", env = "TRAP_CONFIG")]
    config: Option<PathBuf>,

    /// JSON array of recorded block bundles
    #[arg(short = 'f', long = "fixture", required_unless_present = "demo")]
    fixture: Option<PathBuf>,

    /// First block to scan (defaults to the first recorded block)
    #[arg(long = "from")]
    from: Option<u64>,

    /// Last block to scan (defaults to the last recorded block)
    #[arg(long = "to")]
    to: Option<u64>,

    /// Keep polling for new blocks until interrupted
    #[arg(long = "follow", conflicts_with_all = ["from", "to"])]
    follow: bool,

    /// Run the built-in two-block scenario
    #[arg(long = "demo", conflicts_with = "fixture")]
    demo: bool,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long = "metrics")]
    metrics: bool,
}

fn load_config(args: &Args) -> Result<TrapConfig> {
    let config = match &args.config {
        Some(path) => TrapConfig::from_file_with_env(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrapConfig::from_env()?,
    };

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.monitoring.log_level)
                }),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Flash Sandwich Trap starting");
    info!(
        "Min price impact: {}%, min flash loan: {}, max blocks between: {}",
        config.parameters.min_price_impact,
        config.parameters.min_flash_loan_size,
        config.parameters.max_blocks_between
    );

    let source = match &args.fixture {
        Some(path) => ReplaySource::from_file(path)
            .await
            .with_context(|| format!("loading fixture {}", path.display()))?,
        None => demo::demo_source()?,
    };
    info!("Replaying {} recorded blocks from '{}'", source.block_count(), source.id());

    let metrics = Arc::new(TrapMetrics::new());
    let (alert_tx, mut alert_rx) = mpsc::channel(64);

    let printer = tokio::spawn(async move {
        while let Some(alert) = alert_rx.recv().await {
            println!("{}", serde_json::to_string_pretty(&alert)?);
        }
        Ok::<_, serde_json::Error>(())
    });

    let first = source.first_block();
    let last = source.latest_block().await.ok();

    let mut monitor = Monitor::new(source, &config)?
        .with_metrics(metrics)
        .with_alert_sink(alert_tx);

    let report = if args.follow {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });
        monitor.run(shutdown_rx).await?
    } else {
        let (Some(from), Some(to)) = (args.from.or(first), args.to.or(last)) else {
            bail!("no blocks to scan");
        };
        monitor.scan(from, to).await?
    };

    // Closing the sink lets the printer drain and finish
    drop(monitor);
    printer.await??;

    info!(
        "Monitoring complete: {} blocks, {} alerts",
        report.blocks_processed,
        report.alerts.len()
    );

    if args.metrics {
        eprintln!("{}", trap_metrics::gather_metrics()?);
    }

    Ok(())
}
