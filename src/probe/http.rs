//! HTTP probe check.
//!
//! Issues a GET against the target. Transport errors and timeouts are `Down`.
//! By default any response at all is `Up`, which is what a plain "can I reach
//! it" link check wants; `require_success_status` narrows that to 2xx/3xx.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{ProbeCheck, ProbeStatus};
use crate::config::HttpCheckConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct HttpCheck {
    client: Client,
    require_success_status: bool,
}

impl HttpCheck {
    pub fn new(config: &HttpCheckConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::ClientBuilder::new()
            .use_rustls_tls()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            require_success_status: config.require_success_status,
        })
    }

    /// Share an existing client; its timeout settings are the caller's concern
    pub fn with_client(client: Client, require_success_status: bool) -> Self {
        Self {
            client,
            require_success_status,
        }
    }

    /// Convenience: default settings with a specific timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let config = HttpCheckConfig {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ..HttpCheckConfig::default()
        };
        Self::new(&config)
    }

    fn classify(&self, status: reqwest::StatusCode) -> ProbeStatus {
        if !self.require_success_status {
            return ProbeStatus::Up;
        }
        ProbeStatus::from_success(status.is_success() || status.is_redirection())
    }
}

#[async_trait]
impl ProbeCheck for HttpCheck {
    async fn check(&self, target: &str) -> ProbeStatus {
        match self.client.get(target).send().await {
            Ok(response) => {
                let status = self.classify(response.status());
                debug!(target = %target, http_status = %response.status(), %status, "HTTP check complete");
                status
            }
            Err(e) => {
                debug!(target = %target, error = %e, timeout = e.is_timeout(), "HTTP check failed");
                ProbeStatus::Down
            }
        }
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `response` to every connection on an ephemeral port
    async fn serve(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
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

    const OK: &str = "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok";
    const UNAVAILABLE: &str =
        "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";

    fn check(require_success_status: bool, timeout_ms: u64) -> HttpCheck {
        HttpCheck::new(&HttpCheckConfig {
            timeout_ms,
            require_success_status,
            ..HttpCheckConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_reachable_target_is_up() {
        let url = serve(OK).await;
        assert_eq!(check(true, 2_000).check(&url).await, ProbeStatus::Up);
    }

    #[tokio::test]
    async fn test_error_status_counts_as_up_by_default() {
        let url = serve(UNAVAILABLE).await;
        assert_eq!(check(false, 2_000).check(&url).await, ProbeStatus::Up);
        assert_eq!(check(true, 2_000).check(&url).await, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn test_refused_connection_is_down() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let status = check(false, 2_000).check(&format!("http://{addr}/")).await;
        assert_eq!(status, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn test_silent_server_times_out_as_down() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let status = check(false, 200).check(&format!("http://{addr}/")).await;
        assert_eq!(status, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn test_invalid_url_is_down() {
        assert_eq!(
            check(false, 500).check("not a url").await,
            ProbeStatus::Down
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = HttpCheck::new(&HttpCheckConfig {
            timeout_ms: 0,
            ..HttpCheckConfig::default()
        });
        assert!(result.is_err());
    }
}
