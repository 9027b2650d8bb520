//! # Prober Configuration System
//!
//! Typed configuration for the scheduler, the HTTP check and logging,
//! loaded from TOML with environment overlays (see [`ConfigManager`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use prober_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let delay = manager.config().scheduler.retry_delay()?;
//! let timeout = manager.config().http.timeout();
//! # Ok(())
//! # }
//! ```
//!
//! Every section has defaults, so an empty file (or no file, via
//! [`ProberConfig::default`]) is a valid configuration.

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_OUTCOME_BUFFER, DEFAULT_RETRY_DELAY_MS, DEFAULT_TARGETS,
    DEFAULT_USER_AGENT,
};
use crate::error::{ProberError, Result};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring prober-config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProberConfig {
    /// Relaunch cadence, fan-out and result channel sizing
    pub scheduler: SchedulerConfig,

    /// Settings for the built-in HTTP check
    pub http: HttpCheckConfig,

    /// Console log output
    pub logging: LoggingConfig,

    /// Probe targets; empty means the built-in default link set
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay between a delivered outcome and the probe's next launch.
    /// Signed so that a negative value can be reported instead of wrapped.
    pub retry_delay_ms: i64,

    /// Cap on checks running at once; `None` launches every probe freely
    pub max_concurrent_checks: Option<usize>,

    /// Cycles per probe before it is retired; `None` relaunches forever
    pub max_cycles: Option<u64>,

    /// Capacity of the result channel
    pub outcome_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_concurrent_checks: None,
            max_cycles: None,
            outcome_buffer: DEFAULT_OUTCOME_BUFFER,
        }
    }
}

impl SchedulerConfig {
    /// Scheduler settings with the given delay and every other field defaulted.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            retry_delay_ms: i64::try_from(delay.as_millis()).unwrap_or(i64::MAX),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_delay_ms < 0 {
            return Err(ProberError::invalid_config(format!(
                "retry_delay_ms must be >= 0, got {}",
                self.retry_delay_ms
            )));
        }
        if self.outcome_buffer == 0 {
            return Err(ProberError::invalid_config(
                "outcome_buffer must be greater than 0",
            ));
        }
        if self.max_concurrent_checks == Some(0) {
            return Err(ProberError::invalid_config(
                "max_concurrent_checks must be greater than 0 when set",
            ));
        }
        if self.max_cycles == Some(0) {
            return Err(ProberError::invalid_config(
                "max_cycles must be greater than 0 when set",
            ));
        }
        Ok(())
    }

    /// Relaunch delay as a `Duration`; fails for negative values.
    pub fn retry_delay(&self) -> Result<Duration> {
        u64::try_from(self.retry_delay_ms)
            .map(Duration::from_millis)
            .map_err(|_| {
                ProberError::invalid_config(format!(
                    "retry_delay_ms must be >= 0, got {}",
                    self.retry_delay_ms
                ))
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpCheckConfig {
    pub timeout_ms: u64,

    /// When false any received response counts as up, even a 5xx
    pub require_success_status: bool,

    pub user_agent: String,
}

impl Default for HttpCheckConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            require_success_status: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(ProberError::invalid_config(
                "http.timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive such as `info` or `prober_core=debug`
    pub level: Option<String>,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Probe identifier; defaults to the url
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
}

impl TargetConfig {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            id: None,
            url: url.into(),
        }
    }

    pub fn probe_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }
}

impl ProberConfig {
    /// Configured targets, falling back to the built-in link set.
    pub fn effective_targets(&self) -> Vec<TargetConfig> {
        if self.targets.is_empty() {
            DEFAULT_TARGETS.iter().map(|url| TargetConfig::new(*url)).collect()
        } else {
            self.targets.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.http.validate()?;

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.url.trim().is_empty() {
                return Err(ProberError::invalid_config(format!(
                    "target '{}' has an empty url",
                    target.probe_id()
                )));
            }
            if !seen.insert(target.probe_id()) {
                return Err(ProberError::invalid_config(format!(
                    "duplicate target id '{}'",
                    target.probe_id()
                )));
            }
        }
        Ok(())
    }
}
