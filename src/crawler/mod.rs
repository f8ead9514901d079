//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with error classification
//! - Main-content extraction and link extraction
//! - Change detection against the stored content hash
//! - Per-host throttling and in-flight URL locks
//! - Overall crawl coordination

mod change;
mod coordinator;
mod extractor;
mod fetcher;
mod links;
mod throttle;
mod url_locks;

pub use change::{content_hash, is_recently_crawled, should_store, ChangeDecision};
pub use coordinator::{CrawlReport, Crawler, SharedStore, SingleCrawlResult};
pub use extractor::{ContentExtractor, ExtractedContent};
pub use fetcher::{build_http_client, fetch_page, is_html_content_type, FetchedPage};
pub use links::extract_links;
pub use throttle::HostThrottle;
pub use url_locks::{UrlLockGuard, UrlLocks};
