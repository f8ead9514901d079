//! Page listings and chat context entries

use crate::state::PageStatus;
use crate::storage::{ContentStore, CrawledPage, StorageResult};
use chrono::{DateTime, Utc};

/// One row of the crawled-content listing
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub status: PageStatus,
    pub crawled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Stored content length in characters
    pub content_length: usize,
}

impl From<&CrawledPage> for PageSummary {
    fn from(page: &CrawledPage) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            status: page.status,
            crawled_at: page.crawled_at,
            updated_at: page.updated_at,
            content_length: page.content_length(),
        }
    }
}

/// A search hit handed to the chat layer as prompt context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub title: String,
    pub content: String,
    pub url: String,
}

impl From<CrawledPage> for ContextEntry {
    fn from(page: CrawledPage) -> Self {
        Self {
            title: page.title,
            content: page.content,
            url: page.url,
        }
    }
}

/// Lists stored pages, most recently updated first
pub fn list_crawled_content(
    store: &dyn ContentStore,
    limit: usize,
    offset: usize,
) -> StorageResult<Vec<PageSummary>> {
    Ok(store
        .list(limit, offset)?
        .iter()
        .map(PageSummary::from)
        .collect())
}

/// Prints a listing to stdout
pub fn print_listing(pages: &[PageSummary]) {
    if pages.is_empty() {
        println!("No crawled content.");
        return;
    }

    for page in pages {
        let crawled = page
            .crawled_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!("[{}] {}", page.status, page.url);
        println!("  Title: {}", page.title);
        println!(
            "  Crawled: {}  Updated: {}  Length: {} chars",
            crawled,
            page.updated_at.to_rfc3339(),
            page.content_length
        );
    }
}

/// Prints context entries to stdout, content clipped to `preview_chars`
pub fn print_context(entries: &[ContextEntry], preview_chars: usize) {
    if entries.is_empty() {
        println!("No matching content.");
        return;
    }

    for (i, entry) in entries.iter().enumerate() {
        let preview: String = entry.content.chars().take(preview_chars).collect();
        let ellipsis = if entry.content.chars().count() > preview_chars {
            "..."
        } else {
            ""
        };
        println!("{}. {} ({})", i + 1, entry.title, entry.url);
        println!("   {}{}", preview, ellipsis);
    }
}
