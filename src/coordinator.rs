//! # Link Checker Coordinator
//!
//! Caller-side glue: builds probes from configuration, starts a session,
//! drains outcomes into sinks and a running tally, and shuts the session
//! down when told to.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::config::{ProberConfig, SchedulerConfig};
use crate::constants::DEFAULT_SHUTDOWN_TIMEOUT_MS;
use crate::error::Result;
use crate::logging::log_outcome;
use crate::probe::{HttpCheck, Outcome, Probe, ProbeCheck, ProbeStatus};
use crate::scheduler::{self, ShutdownReport};

/// Receives every delivered outcome, in delivery order
pub trait OutcomeSink: Send {
    fn record(&mut self, outcome: &Outcome);
}

/// Logs outcomes through `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&mut self, outcome: &Outcome) {
        log_outcome(outcome);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeTally {
    pub up: u64,
    pub down: u64,
    pub last_status: Option<ProbeStatus>,
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// Per-probe up/down counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeTally {
    probes: BTreeMap<String, ProbeTally>,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &Outcome) {
        let entry = self.probes.entry(outcome.probe_id.clone()).or_default();
        match outcome.status {
            ProbeStatus::Up => entry.up += 1,
            ProbeStatus::Down => entry.down += 1,
        }
        entry.last_status = Some(outcome.status);
        entry.last_completed_at = Some(outcome.completed_at);
    }

    pub fn get(&self, probe_id: &str) -> Option<&ProbeTally> {
        self.probes.get(probe_id)
    }

    pub fn total(&self) -> u64 {
        self.probes.values().map(|t| t.up + t.down).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProbeTally)> {
        self.probes.iter()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tally: OutcomeTally,
    pub shutdown: ShutdownReport,
}

pub struct Coordinator {
    probes: Vec<Probe>,
    scheduler: SchedulerConfig,
    shutdown_timeout: Duration,
    sinks: Vec<Box<dyn OutcomeSink>>,
}

impl Coordinator {
    pub fn new(probes: Vec<Probe>, scheduler: SchedulerConfig) -> Self {
        Self {
            probes,
            scheduler,
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            sinks: vec![Box::new(TracingSink)],
        }
    }

    /// HTTP probes for every effective target, sharing one client
    pub fn from_config(config: &ProberConfig) -> Result<Self> {
        config.validate()?;
        let check: Arc<dyn ProbeCheck> = Arc::new(HttpCheck::new(&config.http)?);
        let probes = config
            .effective_targets()
            .iter()
            .map(|target| Probe::with_target(target.probe_id(), target.url.clone(), check.clone()))
            .collect();
        Ok(Self::new(probes, config.scheduler.clone()))
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn OutcomeSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Replace the default tracing sink
    pub fn with_sinks(mut self, sinks: Vec<Box<dyn OutcomeSink>>) -> Self {
        self.sinks = sinks;
        self
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Outcomes after which every probe has retired, if cycles are capped
    fn expected_outcomes(&self) -> Option<u64> {
        self.scheduler
            .max_cycles
            .map(|cycles| cycles.saturating_mul(self.probes.len() as u64))
    }

    /// Run until `shutdown` resolves, or until every capped probe has
    /// finished its cycles, then stop and join the session.
    #[instrument(skip_all)]
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let expected = self.expected_outcomes();
        let mut session = scheduler::start(std::mem::take(&mut self.probes), &self.scheduler)?;
        let mut outcomes = session.outcomes()?;
        let mut tally = OutcomeTally::default();

        tokio::pin!(shutdown);
        loop {
            if expected.is_some_and(|expected| tally.total() >= expected) {
                info!(outcomes = tally.total(), "All probes completed their cycles");
                break;
            }
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                outcome = outcomes.recv() => match outcome {
                    Some(outcome) => {
                        tally.record(&outcome);
                        for sink in self.sinks.iter_mut() {
                            sink.record(&outcome);
                        }
                    }
                    None => break,
                },
            }
        }

        let shutdown = session.shutdown(self.shutdown_timeout).await?;
        info!(
            delivered = shutdown.delivered,
            discarded = shutdown.discarded,
            timed_out = shutdown.timed_out,
            "Link checker finished"
        );
        Ok(RunSummary { tally, shutdown })
    }
}
