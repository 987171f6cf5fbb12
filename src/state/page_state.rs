/// Page status definitions for tracking crawl progress
///
/// A sitemap entry starts as `Pending` when its link is first accepted and
/// moves to `Visited` once the page was fetched and extracted. There is no
/// other transition.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a page in the sitemap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Page was discovered and accepted but has not been loaded yet
    Pending,

    /// Page was loaded and extracted successfully
    Visited,
}

impl PageStatus {
    /// Returns true if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Visited)
    }

    /// Converts the status to its string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Visited => "visited",
        }
    }

    /// Parses a status from its string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "visited" => Some(Self::Visited),
            _ => None,
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
