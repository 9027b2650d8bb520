//! One launch of one probe: acquire a slot, run the check, deliver the
//! outcome, report back to the supervisor.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::probe::{Outcome, Probe};

/// Sent to the supervisor when a launch has finished, delivered or not
#[derive(Debug, Clone)]
pub(crate) struct LaunchReport {
    pub probe_id: String,
    pub epoch: u64,
    pub cycle: u64,
    pub delivered: bool,
}

/// Held for the duration of a check when a concurrency cap is configured
enum CheckSlot {
    Unlimited,
    Permit(OwnedSemaphorePermit),
}

pub(crate) struct Launch {
    pub probe: Probe,
    pub epoch: u64,
    pub cycle: u64,
    pub outcome_tx: mpsc::Sender<Outcome>,
    pub report_tx: mpsc::UnboundedSender<LaunchReport>,
    pub token: CancellationToken,
    pub limiter: Option<Arc<Semaphore>>,
}

impl Launch {
    pub(crate) async fn run(self) {
        let delivered = self.execute().await;

        let report = LaunchReport {
            probe_id: self.probe.id().to_string(),
            epoch: self.epoch,
            cycle: self.cycle,
            delivered,
        };
        // Supervisor gone means the session is over
        let _ = self.report_tx.send(report);
    }

    async fn execute(&self) -> bool {
        let slot = match self.acquire_slot().await {
            Some(slot) => slot,
            None => {
                debug!("Session stopped before a check slot was free");
                return false;
            }
        };

        // Stop does not interrupt a running check
        let started = Instant::now();
        let status = self.probe.run_check().await;
        let duration = started.elapsed();
        if let CheckSlot::Permit(permit) = slot {
            drop(permit);
        }

        let outcome = Outcome {
            probe_id: self.probe.id().to_string(),
            target: self.probe.target().to_string(),
            status,
            completed_at: Utc::now(),
            cycle: self.cycle,
            duration,
        };

        if self.token.is_cancelled() {
            debug!(%status, "Discarding outcome produced after stop");
            return false;
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!(%status, "Discarding outcome blocked at stop");
                false
            }
            sent = self.outcome_tx.send(outcome) => {
                trace!(%status, delivered = sent.is_ok(), "Outcome sent");
                sent.is_ok()
            }
        }
    }

    /// `None` when the session stopped while waiting for a slot
    async fn acquire_slot(&self) -> Option<CheckSlot> {
        let Some(limiter) = &self.limiter else {
            return Some(CheckSlot::Unlimited);
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            permit = limiter.clone().acquire_owned() => permit.ok().map(CheckSlot::Permit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeStatus;
    use std::time::Duration;

    fn launch(
        probe: Probe,
        outcome_tx: mpsc::Sender<Outcome>,
        token: CancellationToken,
    ) -> (Launch, mpsc::UnboundedReceiver<LaunchReport>) {
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        (
            Launch {
                probe,
                epoch: 7,
                cycle: 2,
                outcome_tx,
                report_tx,
                token,
                limiter: None,
            },
            report_rx,
        )
    }

    #[tokio::test]
    async fn test_delivers_then_reports() {
        let (tx, mut rx) = mpsc::channel(1);
        let probe = Probe::from_fn("a", |_| async { ProbeStatus::Up });
        let (launch, mut reports) = launch(probe, tx, CancellationToken::new());

        launch.run().await;

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.probe_id, "a");
        assert_eq!(outcome.cycle, 2);
        let report = reports.recv().await.unwrap();
        assert!(report.delivered);
        assert_eq!(report.epoch, 7);
    }

    #[tokio::test]
    async fn test_outcome_after_stop_is_discarded() {
        let (tx, mut rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let stop = token.clone();
        let probe = Probe::from_fn("slow", move |_| {
            let stop = stop.clone();
            async move {
                stop.cancel();
                ProbeStatus::Down
            }
        });
        let (launch, mut reports) = launch(probe, tx, token);

        launch.run().await;

        assert!(rx.try_recv().is_err());
        assert!(!reports.recv().await.unwrap().delivered);
    }

    #[tokio::test]
    async fn test_blocked_send_released_by_stop() {
        let (tx, _rx) = mpsc::channel(1);
        tx.send(Outcome {
            probe_id: "filler".to_string(),
            target: "filler".to_string(),
            status: ProbeStatus::Up,
            completed_at: Utc::now(),
            cycle: 1,
            duration: Duration::ZERO,
        })
        .await
        .unwrap();

        let token = CancellationToken::new();
        let probe = Probe::from_fn("a", |_| async { ProbeStatus::Up });
        let (launch, mut reports) = launch(probe, tx, token.clone());

        let handle = tokio::spawn(launch.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        token.cancel();
        handle.await.unwrap();
        assert!(!reports.recv().await.unwrap().delivered);
    }
}
