#![allow(clippy::doc_markdown)] // Allow technical terms like TOML, HTTP in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Prober Core Rust
//!
//! Recurring concurrent probe scheduler with a reusable HTTP link checker.
//!
//! ## Overview
//!
//! A session runs every registered probe as an independent task. Each check
//! produces an [`Outcome`] on a bounded result channel; once the outcome has
//! been delivered, the probe waits the configured delay and runs again. This
//! repeats until the session is stopped.
//!
//! ## Module Organization
//!
//! - [`probe`] - The probe capability, outcomes, HTTP and TCP checks
//! - [`scheduler`] - Sessions: launch, relaunch, add/remove, stop
//! - [`coordinator`] - Link checker glue that drains outcomes into sinks
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prober_core::config::ProberConfig;
//! use prober_core::coordinator::Coordinator;
//!
//! # async fn example() -> prober_core::Result<()> {
//! let config = ProberConfig::default();
//! let summary = Coordinator::from_config(&config)?
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! println!("{} outcomes", summary.tally.total());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests, no network access required
//! ```

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod probe;
pub mod scheduler;

pub use config::{ConfigManager, HttpCheckConfig, ProberConfig, SchedulerConfig, TargetConfig};
pub use coordinator::{Coordinator, OutcomeSink, OutcomeTally, RunSummary};
pub use error::{ProberError, Result};
pub use probe::{FnCheck, HttpCheck, Outcome, Probe, ProbeCheck, ProbeStatus, TcpCheck};
pub use scheduler::{
    Outcomes, ProbeRegistration, Scheduler, SessionHandle, SessionStatus, ShutdownReport,
};
