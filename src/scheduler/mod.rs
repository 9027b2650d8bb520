//! # Probe Scheduler
//!
//! Runs every registered probe as its own task, delivers each outcome on a
//! bounded result channel, waits the configured delay and launches the probe
//! again, until the session is stopped.
//!
//! ## Key Components
//!
//! - [`Scheduler`] - validates settings and probe sets, starts sessions
//! - [`SessionHandle`] - add/remove probes, stop, status, shutdown-join
//! - [`Outcomes`] - the consumer side of the result channel
//!
//! ## Usage
//!
//! ```rust,no_run
//! use prober_core::probe::{Probe, ProbeStatus};
//! use prober_core::scheduler::Scheduler;
//! use std::time::Duration;
//!
//! # async fn example() -> prober_core::Result<()> {
//! let probes = vec![
//!     Probe::from_fn("a", |_| async { ProbeStatus::Up }),
//!     Probe::from_fn("b", |_| async { ProbeStatus::Down }),
//! ];
//! let mut session = Scheduler::with_delay(Duration::from_millis(100)).start(probes)?;
//! let mut outcomes = session.outcomes()?;
//!
//! while let Some(outcome) = outcomes.recv().await {
//!     println!("{} is {}", outcome.probe_id, outcome.status);
//!     # break;
//! }
//! session.shutdown(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Per-probe lifelines are independent: a slow or failing probe never delays
//! the others. Within one lifeline, launch N+1 starts only after launch N's
//! outcome has been delivered and the delay has elapsed.

mod outcomes;
mod supervisor;
mod task;

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{ProberError, Result};
use crate::probe::Probe;

pub use outcomes::Outcomes;

use self::supervisor::{SessionCommand, SessionCounters, Supervisor, SupervisorSettings};

/// Starts probe sessions with a fixed set of scheduler settings
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Default settings with the given relaunch delay
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            config: SchedulerConfig::with_delay(delay),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validate the probe set, launch one task per probe, and hand back the
    /// session handle. Nothing is launched if validation fails.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, probes: Vec<Probe>) -> Result<SessionHandle> {
        self.config.validate()?;
        let retry_delay = self.config.retry_delay()?;

        let mut seen = HashSet::with_capacity(probes.len());
        for probe in &probes {
            if !seen.insert(probe.id()) {
                return Err(ProberError::invalid_config(format!(
                    "duplicate probe id '{}'",
                    probe.id()
                )));
            }
        }

        tokio::runtime::Handle::try_current().map_err(|_| {
            ProberError::Internal("probe sessions must be started inside a Tokio runtime".into())
        })?;

        let session_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let counters = Arc::new(SessionCounters::default());
        let (outcome_tx, outcome_rx) = mpsc::channel(self.config.outcome_buffer);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        info!(
            session_id = %session_id,
            probes = probes.len(),
            retry_delay_ms = retry_delay.as_millis() as u64,
            max_concurrent_checks = ?self.config.max_concurrent_checks,
            max_cycles = ?self.config.max_cycles,
            "Starting probe session"
        );

        let mut supervisor = Supervisor::new(
            session_id,
            SupervisorSettings {
                retry_delay,
                max_cycles: self.config.max_cycles,
                max_concurrent_checks: self.config.max_concurrent_checks,
            },
            outcome_tx,
            command_rx,
            token.clone(),
            counters.clone(),
        );
        for probe in probes {
            supervisor.register_and_launch(probe);
        }

        let span = info_span!("probe_session", session_id = %session_id);
        let join = tokio::spawn(supervisor.run().instrument(span));

        Ok(SessionHandle {
            session_id,
            commands: command_tx,
            outcomes: Some(Outcomes::new(outcome_rx, token.clone())),
            token,
            counters,
            supervisor: Some(join),
        })
    }
}

/// Start a session with explicit settings
pub fn start(probes: Vec<Probe>, config: &SchedulerConfig) -> Result<SessionHandle> {
    Scheduler::new(config.clone())?.start(probes)
}

/// Start a session with default settings and the given relaunch delay
pub fn start_with_delay(probes: Vec<Probe>, delay: Duration) -> Result<SessionHandle> {
    Scheduler::with_delay(delay).start(probes)
}

/// Result of [`SessionHandle::add_probe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeRegistration {
    /// New identifier; its first check has been launched
    Added,
    /// Existing identifier; the new definition applies from its next launch
    Replaced,
}

/// Point-in-time view of a running session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub running: bool,
    pub probe_ids: Vec<String>,
    pub in_flight: u64,
    pub pending_relaunches: usize,
    pub launches: u64,
    pub delivered: u64,
    pub discarded: u64,
    pub retired: u64,
}

/// Totals at the end of [`SessionHandle::shutdown`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    pub session_id: Uuid,
    pub launches: u64,
    pub delivered: u64,
    pub discarded: u64,
    pub retired: u64,
    /// In-flight checks outlived the timeout and were aborted
    pub timed_out: bool,
}

/// Handle to one running session. Dropping it stops the session.
#[derive(Debug)]
pub struct SessionHandle {
    session_id: Uuid,
    commands: mpsc::UnboundedSender<SessionCommand>,
    outcomes: Option<Outcomes>,
    token: CancellationToken,
    counters: Arc<SessionCounters>,
    supervisor: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Take the outcome receiver; only one consumer per session
    pub fn outcomes(&mut self) -> Result<Outcomes> {
        self.outcomes.take().ok_or(ProberError::OutcomesTaken)
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stop relaunching and suppress late outcomes. Running checks are left to
    /// finish on their own. Safe to call more than once.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            info!(session_id = %self.session_id, "Stop requested");
            self.token.cancel();
        }
    }

    /// Token that is cancelled when the session stops
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub async fn add_probe(&self, probe: Probe) -> Result<ProbeRegistration> {
        self.request(|reply| SessionCommand::AddProbe { probe, reply })
            .await
    }

    /// Returns whether the id was registered. An in-flight check for it still
    /// delivers its outcome; it is just not relaunched.
    pub async fn remove_probe(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.request(|reply| SessionCommand::RemoveProbe { id, reply })
            .await
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    /// Stop, then wait up to `timeout` for the supervisor and in-flight checks.
    /// Anything still running after that is aborted.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<ShutdownReport> {
        self.stop();

        let mut timed_out = false;
        if let Some(mut supervisor) = self.supervisor.take() {
            match tokio::time::timeout(timeout, &mut supervisor).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(ProberError::Internal(format!(
                        "session supervisor failed: {e}"
                    )))
                }
                Err(_) => {
                    warn!(
                        session_id = %self.session_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "In-flight checks did not finish in time; aborting"
                    );
                    supervisor.abort();
                    timed_out = true;
                }
            }
        }

        Ok(ShutdownReport {
            session_id: self.session_id,
            launches: SessionCounters::get(&self.counters.launches),
            delivered: SessionCounters::get(&self.counters.delivered),
            discarded: SessionCounters::get(&self.counters.discarded),
            retired: SessionCounters::get(&self.counters.retired),
            timed_out,
        })
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        if self.token.is_cancelled() {
            return Err(ProberError::SessionStopped);
        }
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| ProberError::SessionStopped)?;
        response.await.map_err(|_| ProberError::SessionStopped)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
