//! Storage traits and error types
//!
//! This module defines the trait interface for content store backends and
//! associated error types.

use crate::state::PageStatus;
use crate::storage::CrawledPage;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for content store implementations
///
/// Records are keyed by normalized URL. Callers serialize access (the crawler
/// keeps the store behind a mutex), so implementations only need to be `Send`.
pub trait ContentStore: Send {
    /// Gets a page by URL
    fn get(&self, url: &str) -> StorageResult<Option<CrawledPage>>;

    /// Inserts a page or replaces every field of the existing record
    fn upsert(&mut self, page: &CrawledPage) -> StorageResult<()>;

    /// Advances `updated_at` only, leaving content, title and hash untouched
    ///
    /// Returns false if no record exists for the URL.
    fn touch(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<bool>;

    /// Creates a pending record if the URL is not stored yet
    ///
    /// Returns true if a record was created.
    fn ensure_pending(&mut self, url: &str, at: DateTime<Utc>) -> StorageResult<bool>;

    /// Marks a page as failed, creating the record when absent
    ///
    /// The message and kind are recorded in the page metadata; stored content
    /// and hash are retained.
    fn mark_error(
        &mut self,
        url: &str,
        message: &str,
        kind: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Gets all pages with the given status, ordered by URL
    fn list_by_status(&self, status: PageStatus) -> StorageResult<Vec<CrawledPage>>;

    /// Keyword search over crawled pages, most relevant first
    ///
    /// Falls back to a whole-query substring match ordered by recency when no
    /// page matches any keyword.
    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<CrawledPage>>;

    /// Pages ordered by most recent update
    fn list(&self, limit: usize, offset: usize) -> StorageResult<Vec<CrawledPage>>;

    /// Counts pages by status
    fn count_by_status(&self, status: PageStatus) -> StorageResult<u64>;

    /// Gets total page count
    fn count_total(&self) -> StorageResult<u64>;

    /// Most recent successful crawl time across all pages
    fn last_crawled_at(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Deletes one page; returns true if it existed
    fn delete(&mut self, url: &str) -> StorageResult<bool>;

    /// Deletes every page; returns the number removed
    fn clear(&mut self) -> StorageResult<u64>;
}
