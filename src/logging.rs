//! # Structured Logging Module
//!
//! Environment-aware `tracing` setup for the link-checker binary and for
//! embedders that want the same console format. The library itself only
//! emits events; nothing here is required for the scheduler to run.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{ConfigManager, LoggingConfig};
use crate::probe::{Outcome, ProbeStatus};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging; later calls are no-ops
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let filter = resolve_filter(config, &environment);

        let console = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(EnvFilter::new(filter.clone()))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(filter.clone()))
                .boxed()
        };

        // An embedding application may already own the global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            filter = %filter,
            json = config.json,
            "Structured logging initialized"
        );
    });
}

/// `RUST_LOG` wins, then the configured level, then the environment default
fn resolve_filter(config: &LoggingConfig, environment: &str) -> String {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| config.level.clone())
        .unwrap_or_else(|| get_log_level(environment).to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log one probe outcome in the link checker's wording
pub fn log_outcome(outcome: &Outcome) {
    match outcome.status {
        ProbeStatus::Up => tracing::info!(
            probe_id = %outcome.probe_id,
            cycle = outcome.cycle,
            duration_ms = outcome.duration.as_millis() as u64,
            completed_at = %outcome.completed_at.to_rfc3339(),
            "{} is up!",
            outcome.target
        ),
        ProbeStatus::Down => tracing::warn!(
            probe_id = %outcome.probe_id,
            cycle = outcome.cycle,
            duration_ms = outcome.duration.as_millis() as u64,
            completed_at = %outcome.completed_at.to_rfc3339(),
            "{} might be down!",
            outcome.target
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_configured_level_used_without_rust_log() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: Some("warn".to_string()),
            json: false,
        };
        assert_eq!(resolve_filter(&config, "development"), "warn");
        assert_eq!(
            resolve_filter(&LoggingConfig::default(), "production"),
            "info"
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init_structured_logging(&config);
        init_structured_logging(&config);
    }
}
