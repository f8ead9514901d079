//! Crawl status from the content store
//!
//! This module provides functionality for extracting and displaying the
//! crawl status shown to operators.

use crate::config::Config;
use crate::state::PageStatus;
use crate::storage::{ContentStore, StorageResult, META_ERROR_KIND};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Crawl status summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatus {
    /// Number of stored URLs
    pub total_urls: u64,

    /// URLs whose last fetch succeeded
    pub crawled_urls: u64,

    /// URLs whose last fetch failed
    pub error_urls: u64,

    /// URLs whose fetch never resolved (interrupted runs)
    pub pending_urls: u64,

    /// Most recent successful crawl
    pub last_crawl_timestamp: Option<DateTime<Utc>>,

    /// Number of configured seed sites
    pub configured_sites: usize,

    /// Whether scheduled runs will crawl
    pub auto_crawl_enabled: bool,

    /// Failing URLs grouped by failure kind
    pub errors_by_kind: BTreeMap<String, u64>,
}

/// Loads the crawl status
///
/// # Arguments
///
/// * `store` - The content store to query
/// * `config` - The active configuration (seed count and flags)
///
/// # Returns
///
/// * `Ok(CrawlStatus)` - Successfully loaded status
/// * `Err(StorageError)` - Failed to query the store
pub fn load_status(store: &dyn ContentStore, config: &Config) -> StorageResult<CrawlStatus> {
    let mut errors_by_kind = BTreeMap::new();
    for page in store.list_by_status(PageStatus::Error)? {
        let kind = page
            .metadata
            .get(META_ERROR_KIND)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        *errors_by_kind.entry(kind).or_insert(0) += 1;
    }

    Ok(CrawlStatus {
        total_urls: store.count_total()?,
        crawled_urls: store.count_by_status(PageStatus::Crawled)?,
        error_urls: store.count_by_status(PageStatus::Error)?,
        pending_urls: store.count_by_status(PageStatus::Pending)?,
        last_crawl_timestamp: store.last_crawled_at()?,
        configured_sites: config.sites.seeds.len(),
        auto_crawl_enabled: config.crawler.enabled && config.crawler.auto_crawl_enabled,
        errors_by_kind,
    })
}

/// Prints the status to stdout in a formatted manner
pub fn print_status(status: &CrawlStatus) {
    println!("=== Crawl Status ===\n");

    println!("Overview:");
    println!("  Configured sites: {}", status.configured_sites);
    println!(
        "  Auto crawl: {}",
        if status.auto_crawl_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    match status.last_crawl_timestamp {
        Some(at) => println!("  Last crawl: {}", at.to_rfc3339()),
        None => println!("  Last crawl: never"),
    }
    println!();

    println!("URLs by Status:");
    println!("  Total: {}", status.total_urls);
    println!("  Crawled: {}", status.crawled_urls);
    println!("  Error: {}", status.error_urls);
    println!("  Pending: {}", status.pending_urls);
    println!();

    if !status.errors_by_kind.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = status.errors_by_kind.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    let success_rate = if status.total_urls > 0 {
        (status.crawled_urls as f64 / status.total_urls as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} URLs crawled successfully)",
        success_rate, status.crawled_urls, status.total_urls
    );
}
