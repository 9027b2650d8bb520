//! # Link Checker
//!
//! Checks a set of links concurrently and re-checks each one after a fixed
//! delay until interrupted with Ctrl-C.

use anyhow::Context;
use clap::Parser;
use prober_core::config::{ConfigManager, ProberConfig, TargetConfig};
use prober_core::coordinator::Coordinator;
use prober_core::logging::init_structured_logging;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "link-checker")]
#[command(about = "Concurrently check links and keep re-checking them")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (default: config/prober-config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delay between a probe's result and its next check, in milliseconds
    #[arg(long)]
    delay_ms: Option<i64>,

    /// Per-request HTTP timeout, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum number of checks running at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Stop each link after this many checks
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Treat non-2xx/3xx responses as down
    #[arg(long)]
    strict: bool,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Links to check; replaces any configured targets
    urls: Vec<String>,
}

impl Cli {
    fn apply(&self, config: &mut ProberConfig) {
        if let Some(delay_ms) = self.delay_ms {
            config.scheduler.retry_delay_ms = delay_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.http.timeout_ms = timeout_ms;
        }
        if self.max_concurrent.is_some() {
            config.scheduler.max_concurrent_checks = self.max_concurrent;
        }
        if self.max_cycles.is_some() {
            config.scheduler.max_cycles = self.max_cycles;
        }
        if self.strict {
            config.http.require_success_status = true;
        }
        if self.json {
            config.logging.json = true;
        }
        match self.verbose {
            0 => {}
            1 => config.logging.level = Some("info".to_string()),
            2 => config.logging.level = Some("debug".to_string()),
            _ => config.logging.level = Some("trace".to_string()),
        }
        if !self.urls.is_empty() {
            config.targets = self.urls.iter().map(TargetConfig::new).collect();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ProberConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ConfigManager::load().context("loading default configuration")?,
    };
    let mut config = manager.config().clone();
    cli.apply(&mut config);
    config.validate().context("validating configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_structured_logging(&config.logging);

    let coordinator = Coordinator::from_config(&config)
        .context("building probes")?
        .with_shutdown_timeout(Duration::from_millis(
            config.http.timeout_ms.saturating_add(1_000),
        ));
    info!(
        targets = coordinator.probes().len(),
        retry_delay_ms = config.scheduler.retry_delay_ms,
        "Link checker starting"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let summary = coordinator.run_until(shutdown).await?;
    for (probe_id, tally) in summary.tally.iter() {
        info!(
            probe_id = %probe_id,
            up = tally.up,
            down = tally.down,
            last_status = ?tally.last_status,
            "Link summary"
        );
    }
    if summary.shutdown.timed_out {
        warn!("Some checks were still running at exit and were aborted");
    }
    Ok(())
}
