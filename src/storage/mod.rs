//! Storage module for persisting crawled content
//!
//! This module handles all persistence for the crawler, including:
//! - The `CrawledPage` record, one per unique URL
//! - The `ContentStore` trait the orchestrator writes through
//! - A SQLite implementation and an in-memory implementation
//! - Keyword search used to pull chat "context" out of stored pages

mod memory;
mod schema;
mod search;
mod sqlite;
mod traits;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{ContentStore, StorageError, StorageResult};

use crate::state::PageStatus;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Open-ended page metadata (description, keywords, Open Graph fields, ...)
pub type PageMetadata = BTreeMap<String, String>;

/// Metadata key holding the last failure message
pub const META_ERROR: &str = "error";

/// Metadata key holding the stable failure label (see `CrawlError::kind`)
pub const META_ERROR_KIND: &str = "error_kind";

/// Metadata key holding the time of the last failure
pub const META_ERROR_AT: &str = "error_at";

/// One stored page, keyed by its normalized URL
#[derive(Debug, Clone, PartialEq)]
pub struct CrawledPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub metadata: PageMetadata,
    /// SHA-256 of `content`; None until the first successful crawl
    pub content_hash: Option<String>,
    pub status: PageStatus,
    /// Time of the last full write from a successful fetch
    pub crawled_at: Option<DateTime<Utc>>,
    /// Time of the last write of any kind
    pub updated_at: DateTime<Utc>,
}

impl CrawledPage {
    /// A placeholder record for a URL whose first fetch is in progress
    pub fn pending(url: &str, at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            content: String::new(),
            metadata: PageMetadata::new(),
            content_hash: None,
            status: PageStatus::Pending,
            crawled_at: None,
            updated_at: at,
        }
    }

    /// Length of the stored content in characters
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }

    /// The recorded failure message, if the page is in the error state
    pub fn error_message(&self) -> Option<&str> {
        self.metadata.get(META_ERROR).map(String::as_str)
    }

    /// Applies a failure to this record
    ///
    /// Content, title and hash are left as they were so a temporarily failing
    /// page keeps serving its last good text.
    pub(crate) fn apply_error(&mut self, message: &str, kind: &str, at: DateTime<Utc>) {
        self.status = PageStatus::Error;
        self.metadata
            .insert(META_ERROR.to_string(), message.to_string());
        self.metadata
            .insert(META_ERROR_KIND.to_string(), kind.to_string());
        self.metadata.insert(META_ERROR_AT.to_string(), at.to_rfc3339());
        self.updated_at = at;
    }
}
