use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::probe::Outcome;

/// Receiving end of a session's result channel.
///
/// Yields outcomes in completion order and ends once the session is stopped,
/// even if outcomes produced just before the stop are still buffered. Probe
/// tasks block on a full channel, and a blocked task does not start its
/// relaunch delay, so the consumer has to keep draining.
#[derive(Debug)]
pub struct Outcomes {
    rx: mpsc::Receiver<Outcome>,
    token: CancellationToken,
}

impl Outcomes {
    pub(crate) fn new(rx: mpsc::Receiver<Outcome>, token: CancellationToken) -> Self {
        Self { rx, token }
    }

    /// Next outcome, or `None` once the session has stopped
    pub async fn recv(&mut self) -> Option<Outcome> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            outcome = self.rx.recv() => outcome.filter(|_| !self.token.is_cancelled()),
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<Outcome> {
        if self.token.is_cancelled() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn into_stream(self) -> impl Stream<Item = Outcome> + Send {
        futures::stream::unfold(self, |mut outcomes| async move {
            outcomes.recv().await.map(|outcome| (outcome, outcomes))
        })
    }
}
