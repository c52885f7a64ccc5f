//! Child lifecycle status and transition rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one registered child.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChildState {
    /// No start has ever been attempted.
    NotStarted,
    /// Launch and handshake in progress.
    Starting,
    /// Session open and accepting calls.
    Running,
    /// Most recent start attempt failed.
    FailedStart,
    /// Session torn down by an explicit or shutdown stop.
    Stopped,
}

impl ChildState {
    /// Determine whether a lifecycle transition is permitted.
    ///
    /// Every run passes through `Starting`; a stop is accepted from any state
    /// so that stopping a never-started child still records `Stopped`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted | Self::FailedStart | Self::Stopped, Self::Starting)
                | (Self::Starting, Self::Running | Self::FailedStart)
                | (_, Self::Stopped)
        )
    }

    /// Snake-case label used in human-readable messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::FailedStart => "failed_start",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ChildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status record for one child, kept as history across restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChildStatus {
    /// Current lifecycle state.
    pub status: ChildState,
    /// Cause of the most recent failure, if any.
    pub error: Option<String>,
    /// When the current or most recent session became ready.
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for ChildStatus {
    fn default() -> Self {
        Self {
            status: ChildState::NotStarted,
            error: None,
            started_at: None,
        }
    }
}
