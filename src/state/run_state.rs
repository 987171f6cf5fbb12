use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a crawl run
///
/// `Running` is the only non-terminal status besides `Idle`; a run ends in
/// exactly one of `Completed`, `Cancelled` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No run has started yet
    Idle,
    /// A run is in progress
    Running,
    /// The run finished and all artifacts were written
    Completed,
    /// The run was cancelled; artifacts are partial
    Cancelled,
    /// The outer crawl sequence failed
    Failed,
}

impl RunStatus {
    /// Returns true if the run has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Parses a run status from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Progress counters reported after every processed page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Number of visited pages
    pub processed: usize,
    /// Number of entries in the sitemap (visited and pending)
    pub total: usize,
    /// The page that was just processed
    pub current_url: Option<String>,
}

impl Progress {
    /// Returns the completion ratio in percent, 0 when nothing is known
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.processed.min(self.total) * 100) / self.total) as u8
    }
}
