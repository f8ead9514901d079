//! Change detection and recrawl freshness
//!
//! A page is rewritten only when its extracted text actually changed; pages
//! crawled inside the recrawl window are not fetched again.

use crate::state::PageStatus;
use crate::storage::CrawledPage;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

/// Computes the lowercase hex SHA-256 of extracted content
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Outcome of comparing freshly extracted content with the stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDecision {
    /// Hash of the new content
    pub hash: String,
    /// True if the stored hash equals the new one
    pub unchanged: bool,
}

impl ChangeDecision {
    /// Returns true when only `updated_at` needs to move
    ///
    /// An unchanged page stuck in the error state still needs a full write to
    /// recover its status.
    pub fn touch_only(&self, existing: Option<&CrawledPage>) -> bool {
        self.unchanged && existing.map_or(false, |page| page.status == PageStatus::Crawled)
    }
}

/// Hashes new content and compares it with the stored record
pub fn should_store(new_content: &str, existing: Option<&CrawledPage>) -> ChangeDecision {
    let hash = content_hash(new_content);
    let unchanged = existing
        .and_then(|page| page.content_hash.as_deref())
        .map_or(false, |stored| stored == hash);

    ChangeDecision { hash, unchanged }
}

/// Returns true if the page was successfully crawled within `window` of `now`
pub fn is_recently_crawled(page: &CrawledPage, now: DateTime<Utc>, window: Duration) -> bool {
    if page.status != PageStatus::Crawled {
        return false;
    }

    match page.crawled_at {
        Some(crawled_at) => now.signed_duration_since(crawled_at) < window,
        None => false,
    }
}
