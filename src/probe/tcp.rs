//! TCP connect check: a target of the form `host:port` is up when a
//! connection is established within the timeout.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use super::{ProbeCheck, ProbeStatus};

#[derive(Debug, Clone)]
pub struct TcpCheck {
    timeout: Duration,
}

impl TcpCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProbeCheck for TcpCheck {
    async fn check(&self, target: &str) -> ProbeStatus {
        match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => ProbeStatus::Up,
            Ok(Err(e)) => {
                debug!(target = %target, error = %e, "TCP connect failed");
                ProbeStatus::Down
            }
            Err(_) => {
                debug!(target = %target, timeout_ms = self.timeout.as_millis() as u64, "TCP connect timed out");
                ProbeStatus::Down
            }
        }
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }
}
