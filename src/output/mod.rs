//! Output module for operator-facing reports
//!
//! This module handles:
//! - Crawl status (counts per status, last crawl, failure kinds)
//! - Listings of stored pages
//! - Context entries returned to the chat layer

mod listing;
pub mod stats;

pub use listing::{list_crawled_content, print_context, print_listing, ContextEntry, PageSummary};
pub use stats::{load_status, print_status, CrawlStatus};
