use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result of one check. `Down` is ordinary data, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl ProbeStatus {
    pub fn is_up(self) -> bool {
        matches!(self, ProbeStatus::Up)
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            ProbeStatus::Up
        } else {
            ProbeStatus::Down
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "up"),
            ProbeStatus::Down => write!(f, "down"),
        }
    }
}

/// One completed probe execution as delivered on the result channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub probe_id: String,
    pub target: String,
    pub status: ProbeStatus,
    pub completed_at: DateTime<Utc>,
    /// 1-based launch number within this probe's lifeline
    pub cycle: u64,
    /// Wall time the check itself took
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl Outcome {
    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}
