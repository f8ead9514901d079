//! Brainpool Crawler: site crawler feeding chat context
//!
//! This crate crawls a configured set of seed sites, extracts the main text of
//! each page, detects unchanged content through hashing, and stores the result
//! in a searchable content store that chat prompts draw "context" from.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {code} for {url}")]
    HttpStatus { url: String, code: u16 },

    #[error("Unsupported content type '{content_type}' for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Domain '{host}' is not in the configured site list: {url}")]
    DisallowedDomain { url: String, host: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Stable label for the failure cause, recorded alongside per-URL errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::UnsupportedContentType { .. } => "unsupported_content_type",
            Self::DisallowedDomain { .. } => "disallowed_domain",
            Self::Config(_) => "config",
            Self::Storage(_) => "storage",
            Self::Url(_) | Self::UrlParse(_) => "invalid_url",
            Self::Http(_) => "http_client",
            Self::Io(_) => "io",
        }
    }

    /// Returns true for failures that belong to a single URL and must not abort a run
    pub fn is_per_url(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::HttpStatus { .. }
                | Self::UnsupportedContentType { .. }
                | Self::Url(_)
                | Self::UrlParse(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse site list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid content selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler, SingleCrawlResult};
pub use state::PageStatus;
pub use storage::{ContentStore, CrawledPage, MemoryStorage, SqliteStorage};
pub use url::{extract_domain, normalize_url};
