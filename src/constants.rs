//! # System Constants
//!
//! Defaults and well-known names shared by the configuration layer, the
//! scheduler and the link-checker binary.

/// Pause between a probe's delivered outcome and its next launch.
pub const DEFAULT_RETRY_DELAY_MS: i64 = 5_000;

/// Upper bound for a single HTTP check.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Capacity of the bounded result channel.
pub const DEFAULT_OUTCOME_BUFFER: usize = 64;

/// Grace period `link-checker` gives in-flight checks on Ctrl-C.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 15_000;

pub const DEFAULT_USER_AGENT: &str = concat!("prober-core-rs/", env!("CARGO_PKG_VERSION"));

/// Targets checked when no configuration names any.
pub const DEFAULT_TARGETS: &[&str] = &[
    "http://www.google.com",
    "http://www.facebook.com",
    "http://www.stackoverflow.com",
    "http://www.golang.org",
    "http://www.amazon.com",
];

pub mod config_files {
    pub const DEFAULT_CONFIG_DIR: &str = "config";
    pub const BASE_CONFIG_NAME: &str = "prober-config";
    pub const CONFIG_EXTENSION: &str = "toml";
}

pub mod env_vars {
    /// Prefix for `PROBER__SECTION__KEY` overrides.
    pub const OVERRIDE_PREFIX: &str = "PROBER";
    pub const OVERRIDE_SEPARATOR: &str = "__";
    pub const ENVIRONMENT: &str = "PROBER_ENV";
    pub const APP_ENVIRONMENT: &str = "APP_ENV";
    pub const DEFAULT_ENVIRONMENT: &str = "development";
}
