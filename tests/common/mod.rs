//! Shared helpers for integration tests: local HTTP targets and
//! instrumented probe checks. Nothing here touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use prober_core::probe::{Probe, ProbeCheck, ProbeStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;

pub const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok";

/// Serves `response` to every connection; returns the base URL
pub async fn spawn_http_target(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/")
}

/// A URL on a port nothing listens on
pub async fn refused_target() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// Records the start instant of every check, per target
#[derive(Clone, Default)]
pub struct CheckLog {
    starts: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl CheckLog {
    pub fn starts(&self, target: &str) -> Vec<Instant> {
        self.starts
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, target: &str) -> usize {
        self.starts(target).len()
    }

    fn record(&self, target: &str) {
        self.starts
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push(Instant::now());
    }
}

/// Sleeps for `latency`, then answers with a fixed status
pub struct ScriptedCheck {
    pub status: ProbeStatus,
    pub latency: Duration,
    pub log: CheckLog,
}

#[async_trait]
impl ProbeCheck for ScriptedCheck {
    async fn check(&self, target: &str) -> ProbeStatus {
        self.log.record(target);
        tokio::time::sleep(self.latency).await;
        self.status
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }
}

pub fn scripted_probe(id: &str, status: ProbeStatus, latency: Duration, log: &CheckLog) -> Probe {
    Probe::new(
        id,
        Arc::new(ScriptedCheck {
            status,
            latency,
            log: log.clone(),
        }),
    )
}
