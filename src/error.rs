//! Error types for the prober system.
//!
//! A failed check is never an error here: it is a [`ProbeStatus::Down`]
//! outcome flowing through the result channel. Only configuration problems
//! and operations on a stopped session surface as [`ProberError`].
//!
//! [`ProbeStatus::Down`]: crate::probe::ProbeStatus::Down

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProberError {
    /// Duplicate probe identifiers, negative delay, or another rejected setting.
    /// Fatal to `start`; no task is launched.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The session has been stopped; the attempted operation was not applied.
    #[error("Session stopped")]
    SessionStopped,

    /// The outcome receiver has already been handed out for this session.
    #[error("Outcome stream already taken for this session")]
    OutcomesTaken,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProberError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// True for errors that only report a stopped session.
    pub fn is_session_stopped(&self) -> bool {
        matches!(self, Self::SessionStopped)
    }
}

impl From<reqwest::Error> for ProberError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProberError>;
