/// Page status definitions for the content store
///
/// Every stored URL is in exactly one of these states.
use std::fmt;

/// Represents the crawl status of a stored page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    /// A fetch was started but its outcome has not been recorded yet
    Pending,

    /// The last fetch succeeded and the content is current
    Crawled,

    /// The last fetch failed; content (if any) is from an earlier crawl
    Error,
}

impl PageStatus {
    /// Returns true if the page holds usable content from its last fetch
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Crawled)
    }

    /// Returns true if the last fetch attempt failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawled => "crawled",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "crawled" => Some(Self::Crawled),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 3] {
        [Self::Pending, Self::Crawled, Self::Error]
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
