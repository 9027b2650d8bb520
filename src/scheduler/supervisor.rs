//! Session supervisor
//!
//! The only owner of the probe map. Commands from the handle, launch reports
//! from probe tasks, and expired relaunch timers are all handled serially in
//! one loop, so concurrent add/remove/stop calls never race each other.

use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, debug_span, info, warn, Instrument};
use uuid::Uuid;

use super::task::{Launch, LaunchReport};
use super::{ProbeRegistration, SessionStatus};
use crate::probe::{Outcome, Probe};

pub(crate) enum SessionCommand {
    AddProbe {
        probe: Probe,
        reply: oneshot::Sender<ProbeRegistration>,
    },
    RemoveProbe {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Counters readable from the handle without a round trip
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub launches: AtomicU64,
    pub delivered: AtomicU64,
    pub discarded: AtomicU64,
    pub retired: AtomicU64,
    pub in_flight: AtomicU64,
}

impl SessionCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

struct ProbeEntry {
    probe: Probe,
    /// Identifies one lifeline; a removed-then-re-added id gets a new epoch
    epoch: u64,
    /// Launches so far in this lifeline
    cycles: u64,
}

pub(crate) struct SupervisorSettings {
    pub retry_delay: Duration,
    pub max_cycles: Option<u64>,
    pub max_concurrent_checks: Option<usize>,
}

pub(crate) struct Supervisor {
    session_id: Uuid,
    probes: HashMap<String, ProbeEntry>,
    next_epoch: u64,
    retry_delay: Duration,
    max_cycles: Option<u64>,
    limiter: Option<Arc<Semaphore>>,
    outcome_tx: mpsc::Sender<Outcome>,
    report_tx: mpsc::UnboundedSender<LaunchReport>,
    report_rx: mpsc::UnboundedReceiver<LaunchReport>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    relaunches: DelayQueue<(String, u64)>,
    tasks: JoinSet<()>,
    token: CancellationToken,
    counters: Arc<SessionCounters>,
}

impl Supervisor {
    pub(crate) fn new(
        session_id: Uuid,
        settings: SupervisorSettings,
        outcome_tx: mpsc::Sender<Outcome>,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
        token: CancellationToken,
        counters: Arc<SessionCounters>,
    ) -> Self {
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        Self {
            session_id,
            probes: HashMap::new(),
            next_epoch: 0,
            retry_delay: settings.retry_delay,
            max_cycles: settings.max_cycles,
            limiter: settings
                .max_concurrent_checks
                .map(|cap| Arc::new(Semaphore::new(cap))),
            outcome_tx,
            report_tx,
            report_rx,
            commands,
            relaunches: DelayQueue::new(),
            tasks: JoinSet::new(),
            token,
            counters,
        }
    }

    /// Register a probe id that is not yet known and launch it immediately
    pub(crate) fn register_and_launch(&mut self, probe: Probe) {
        let id = probe.id().to_string();
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.probes.insert(
            id.clone(),
            ProbeEntry {
                probe,
                epoch,
                cycles: 0,
            },
        );
        self.launch(&id);
    }

    pub(crate) async fn run(mut self) {
        info!(
            probes = self.probes.len(),
            retry_delay_ms = self.retry_delay.as_millis() as u64,
            "Probe session started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                Some(command) = self.commands.recv() => self.handle_command(command),
                Some(report) = self.report_rx.recv() => self.handle_report(report),
                Some(expired) = self.relaunches.next(), if !self.relaunches.is_empty() => {
                    let (id, epoch) = expired.into_inner();
                    self.handle_relaunch(&id, epoch);
                }
            }
        }

        self.wind_down().await;
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::AddProbe { probe, reply } => {
                let registration = self.add_probe(probe);
                let _ = reply.send(registration);
            }
            SessionCommand::RemoveProbe { id, reply } => {
                let removed = self.probes.remove(&id).is_some();
                if removed {
                    info!(probe_id = %id, "Probe removed; an in-flight check still reports");
                } else {
                    warn!(probe_id = %id, "Remove requested for unknown probe");
                }
                let _ = reply.send(removed);
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn add_probe(&mut self, probe: Probe) -> ProbeRegistration {
        match self.probes.get_mut(probe.id()) {
            Some(entry) => {
                debug!(probe_id = %probe.id(), "Probe definition replaced for next cycle");
                entry.probe = probe;
                ProbeRegistration::Replaced
            }
            None => {
                info!(probe_id = %probe.id(), kind = probe.kind(), "Probe added");
                self.register_and_launch(probe);
                ProbeRegistration::Added
            }
        }
    }

    fn handle_report(&mut self, report: LaunchReport) {
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
        if report.delivered {
            SessionCounters::bump(&self.counters.delivered);
        } else {
            SessionCounters::bump(&self.counters.discarded);
        }

        let Some(entry) = self.probes.get(&report.probe_id) else {
            debug!(probe_id = %report.probe_id, cycle = report.cycle, "Removed probe finished; not relaunching");
            return;
        };
        if entry.epoch != report.epoch || !report.delivered {
            return;
        }

        if let Some(max_cycles) = self.max_cycles {
            if entry.cycles >= max_cycles {
                info!(probe_id = %report.probe_id, cycles = entry.cycles, "Probe retired after final cycle");
                self.probes.remove(&report.probe_id);
                SessionCounters::bump(&self.counters.retired);
                return;
            }
        }

        if self.token.is_cancelled() {
            return;
        }

        // Delay starts only once the outcome has been delivered
        self.relaunches
            .insert((report.probe_id, report.epoch), self.retry_delay);
    }

    fn handle_relaunch(&mut self, id: &str, epoch: u64) {
        match self.probes.get(id) {
            Some(entry) if entry.epoch == epoch => self.launch(id),
            _ => debug!(probe_id = %id, "Dropping stale relaunch timer"),
        }
    }

    fn launch(&mut self, id: &str) {
        if self.token.is_cancelled() {
            return;
        }
        let Some(entry) = self.probes.get_mut(id) else {
            return;
        };
        entry.cycles += 1;

        let launch = Launch {
            probe: entry.probe.clone(),
            epoch: entry.epoch,
            cycle: entry.cycles,
            outcome_tx: self.outcome_tx.clone(),
            report_tx: self.report_tx.clone(),
            token: self.token.clone(),
            limiter: self.limiter.clone(),
        };
        let span = debug_span!("probe_launch", probe_id = %id, cycle = entry.cycles);

        SessionCounters::bump(&self.counters.launches);
        self.counters.in_flight.fetch_add(1, Ordering::Relaxed);
        self.tasks.spawn(launch.run().instrument(span));

        // Reap finished launches so the set does not grow with the session
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                warn!(error = %e, "Probe task failed");
            }
        }
    }

    fn status(&self) -> SessionStatus {
        let mut probe_ids: Vec<String> = self.probes.keys().cloned().collect();
        probe_ids.sort();
        SessionStatus {
            session_id: self.session_id,
            running: !self.token.is_cancelled(),
            probe_ids,
            in_flight: SessionCounters::get(&self.counters.in_flight),
            pending_relaunches: self.relaunches.len(),
            launches: SessionCounters::get(&self.counters.launches),
            delivered: SessionCounters::get(&self.counters.delivered),
            discarded: SessionCounters::get(&self.counters.discarded),
            retired: SessionCounters::get(&self.counters.retired),
        }
    }

    /// Refuse further commands, drop pending timers, and let in-flight checks finish
    async fn wind_down(&mut self) {
        self.commands.close();
        while self.commands.try_recv().is_ok() {}
        self.relaunches.clear();

        let in_flight = self.tasks.len();
        info!(in_flight, "Probe session stopping");

        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Probe task failed during shutdown");
            }
        }
        while let Ok(report) = self.report_rx.try_recv() {
            self.handle_report(report);
        }

        info!(
            launches = SessionCounters::get(&self.counters.launches),
            delivered = SessionCounters::get(&self.counters.delivered),
            discarded = SessionCounters::get(&self.counters.discarded),
            "Probe session stopped"
        );
    }
}
