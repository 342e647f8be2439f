use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the refresh state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No refresh in progress
    Idle,
    /// Waiting on the origin
    Fetching,
    /// Writing to cache and store
    Persisting,
    /// Last cycle failed; transient, the coordinator returns to idle
    Failed,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Persisting => write!(f, "persisting"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of the most recently finished refresh cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    /// Number of distinct names published, zero on failure
    pub names: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
