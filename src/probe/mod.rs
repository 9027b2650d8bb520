//! # Probes
//!
//! A [`Probe`] pairs an identifier and target with a pluggable
//! [`ProbeCheck`]. The scheduler clones the probe into a fresh task on every
//! launch and never looks at why a check failed: anything that is not a
//! success, timeouts included, is [`ProbeStatus::Down`].
//!
//! Built-in checks:
//!
//! - [`HttpCheck`] - GET request with a bounded timeout
//! - [`TcpCheck`] - plain TCP connect with a bounded timeout
//! - [`FnCheck`] - adapts an async closure

pub mod http;
pub mod outcome;
pub mod tcp;

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub use http::HttpCheck;
pub use outcome::{Outcome, ProbeStatus};
pub use tcp::TcpCheck;

/// One attempt against a target.
///
/// Implementations own their timeout and must not block indefinitely; a slow
/// check only delays its own probe, but it does delay session shutdown.
#[async_trait]
pub trait ProbeCheck: Send + Sync {
    async fn check(&self, target: &str) -> ProbeStatus;

    /// Short name for logs
    fn kind(&self) -> &'static str {
        "custom"
    }
}

/// Adapts `Fn(String) -> impl Future<Output = ProbeStatus>` into a [`ProbeCheck`]
pub struct FnCheck<F> {
    func: F,
}

impl<F, Fut> FnCheck<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ProbeStatus> + Send,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> ProbeCheck for FnCheck<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ProbeStatus> + Send,
{
    async fn check(&self, target: &str) -> ProbeStatus {
        (self.func)(target.to_string()).await
    }

    fn kind(&self) -> &'static str {
        "fn"
    }
}

/// A named, repeatable check against a target. Immutable once built.
#[derive(Clone)]
pub struct Probe {
    id: String,
    target: String,
    check: Arc<dyn ProbeCheck>,
}

impl Probe {
    /// Probe whose target is its identifier, as with a plain link
    pub fn new<S: Into<String>>(id: S, check: Arc<dyn ProbeCheck>) -> Self {
        let id = id.into();
        Self {
            target: id.clone(),
            id,
            check,
        }
    }

    pub fn with_target<I: Into<String>, T: Into<String>>(
        id: I,
        target: T,
        check: Arc<dyn ProbeCheck>,
    ) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
            check,
        }
    }

    /// Probe backed by an async closure
    pub fn from_fn<S, F, Fut>(id: S, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProbeStatus> + Send + 'static,
    {
        Self::new(id, Arc::new(FnCheck::new(func)))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> &'static str {
        self.check.kind()
    }

    /// Run the check once against this probe's target
    pub async fn run_check(&self) -> ProbeStatus {
        self.check.check(&self.target).await
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("kind", &self.check.kind())
            .finish()
    }
}
