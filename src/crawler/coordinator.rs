//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates every step for each
//! seed site, including:
//! - Depth-bounded traversal with a run-wide visited set
//! - Recrawl-window and in-flight checks
//! - Fetching, extraction, change detection and storage
//! - Per-host throttling and optional parallelism across seeds

use crate::config::{validate, Config};
use crate::crawler::change::{self, should_store};
use crate::crawler::extractor::ContentExtractor;
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::links::extract_links;
use crate::crawler::throttle::HostThrottle;
use crate::crawler::url_locks::{UrlLockGuard, UrlLocks};
use crate::output::{self, ContextEntry, CrawlStatus, PageSummary};
use crate::state::PageStatus;
use crate::storage::{ContentStore, CrawledPage, StorageError};
use crate::url::{extract_domain, is_same_host, normalize_url};
use crate::{CrawlError, Result};
use chrono::Utc;
use reqwest::Client;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Content store shared by every worker of a crawler
pub type SharedStore = Arc<Mutex<dyn ContentStore>>;

/// How often a manual crawl re-checks a URL held by another run
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Seed sites attempted
    pub seeds: usize,
    /// HTTP fetches attempted
    pub fetched: usize,
    /// Pages written in full (new or changed content)
    pub stored: usize,
    /// Pages whose content hash matched the stored one
    pub unchanged: usize,
    /// URLs skipped as recently crawled or in flight elsewhere
    pub skipped: usize,
    /// URLs that failed, plus seeds that could not be crawled
    pub errors: usize,
    /// True if the run stopped at its deadline
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl CrawlReport {
    fn merge(&mut self, other: &CrawlReport) {
        self.seeds += other.seeds;
        self.fetched += other.fetched;
        self.stored += other.stored;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.timed_out |= other.timed_out;
    }
}

/// Outcome of a manual single-URL crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleCrawlResult {
    pub title: String,
    /// Extracted content length in characters
    pub content_length: usize,
    /// Always `Crawled`; failures are returned as `Err` and recorded in the store
    pub status: PageStatus,
}

/// State shared by every seed of one run
struct RunContext {
    visited: Mutex<HashSet<String>>,
    /// None when the timeout is too large to represent
    deadline: Option<Instant>,
}

impl RunContext {
    fn new(timeout: Duration) -> Self {
        Self {
            visited: Mutex::new(HashSet::new()),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    fn is_expired(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Marks a URL visited; returns false if it already was
    fn visit(&self, url: &str) -> bool {
        lock_visited(&self.visited).insert(url.to_string())
    }

    fn was_visited(&self, url: &str) -> bool {
        lock_visited(&self.visited).contains(url)
    }
}

fn lock_visited(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Result of one successful fetch-and-store
struct PageOutcome {
    title: String,
    content_length: usize,
    unchanged: bool,
    links: BTreeSet<String>,
}

/// Main crawler structure
///
/// Cloning is cheap: clones share the store, HTTP client, throttle and URL
/// locks, so a scheduled run and a manual run on clones of one `Crawler`
/// coordinate with each other.
#[derive(Clone)]
pub struct Crawler {
    config: Arc<Config>,
    store: SharedStore,
    client: Client,
    extractor: Arc<ContentExtractor>,
    throttle: Arc<HostThrottle>,
    locks: UrlLocks,
    allowed_hosts: Arc<BTreeSet<String>>,
}

impl Crawler {
    /// Creates a new crawler over the given store
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration; validated again here
    /// * `store` - The content store to write through
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Successfully created crawler
    /// * `Err(CrawlError)` - Invalid configuration or HTTP client failure
    pub fn new<S: ContentStore + 'static>(config: Config, store: S) -> Result<Self> {
        Self::with_shared_store(config, Arc::new(Mutex::new(store)))
    }

    /// Creates a crawler over a store the caller keeps a handle to
    pub fn with_shared_store(config: Config, store: SharedStore) -> Result<Self> {
        validate(&config)?;

        let extractor = ContentExtractor::new(&config.crawler.content_selectors)?;
        let client = build_http_client(&config)?;
        let throttle = HostThrottle::new(Duration::from_millis(config.crawler.delay_ms));

        let mut allowed_hosts = BTreeSet::new();
        for seed in &config.sites.seeds {
            let url = normalize_url(seed)?;
            if let Some(host) = extract_domain(&url) {
                allowed_hosts.insert(host);
            }
        }

        Ok(Self {
            config: Arc::new(config),
            store,
            client,
            extractor: Arc::new(extractor),
            throttle: Arc::new(throttle),
            locks: UrlLocks::new(),
            allowed_hosts: Arc::new(allowed_hosts),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the underlying store
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, dyn ContentStore + 'static>> {
        self.store.lock().map_err(|_| {
            CrawlError::from(StorageError::Database(
                "content store lock poisoned".to_string(),
            ))
        })
    }

    /// Scheduled entry point
    ///
    /// Does nothing unless both the crawl and auto-crawl switches are on.
    pub async fn run_auto_crawl(&self) -> Result<CrawlReport> {
        if !self.config.crawler.enabled {
            tracing::info!("Crawling is disabled; skipping scheduled run");
            return Ok(CrawlReport::default());
        }
        if !self.config.crawler.auto_crawl_enabled {
            tracing::info!("Auto crawl is disabled; skipping scheduled run");
            return Ok(CrawlReport::default());
        }

        self.crawl_all_sites().await
    }

    /// Crawls every configured seed ("crawl now")
    ///
    /// Seeds run one after another with the configured delay between them, or
    /// on up to `max-concurrent-sites` workers. Per-URL failures are recorded
    /// and counted, never propagated.
    pub async fn crawl_all_sites(&self) -> Result<CrawlReport> {
        if !self.config.crawler.enabled {
            tracing::info!("Crawling is disabled; nothing to do");
            return Ok(CrawlReport::default());
        }

        let start = Instant::now();
        let seeds = self.config.sites.seeds.clone();
        let max_depth = self.config.crawler.max_depth;
        let run = Arc::new(RunContext::new(Duration::from_secs(
            self.config.crawler.run_timeout_secs,
        )));

        tracing::info!(
            "Starting crawl of {} site(s), max depth {}",
            seeds.len(),
            max_depth
        );

        let mut report = if self.config.crawler.max_concurrent_sites > 1 && seeds.len() > 1 {
            self.crawl_seeds_parallel(seeds, max_depth, &run).await
        } else {
            self.crawl_seeds_sequential(&seeds, max_depth, &run).await
        };
        report.elapsed = start.elapsed();

        tracing::info!(
            "Crawl finished in {:?}: {} seeds, {} fetched, {} stored, {} unchanged, {} skipped, {} errors{}",
            report.elapsed,
            report.seeds,
            report.fetched,
            report.stored,
            report.unchanged,
            report.skipped,
            report.errors,
            if report.timed_out { " (timed out)" } else { "" }
        );

        Ok(report)
    }

    async fn crawl_seeds_sequential(
        &self,
        seeds: &[String],
        max_depth: u32,
        run: &RunContext,
    ) -> CrawlReport {
        let mut report = CrawlReport::default();
        let between_sites = self.throttle.delay();

        for (i, seed) in seeds.iter().enumerate() {
            if run.is_expired() {
                tracing::warn!("Run deadline reached; {} seed(s) not crawled", seeds.len() - i);
                report.timed_out = true;
                break;
            }
            if i > 0 && !between_sites.is_zero() {
                tokio::time::sleep(between_sites).await;
            }

            report.seeds += 1;
            match self.crawl_site_in_run(seed, max_depth, run).await {
                Ok(site) => report.merge(&site),
                Err(e) => {
                    tracing::error!("Failed to crawl site {}: {}", seed, e);
                    report.errors += 1;
                }
            }
        }

        report
    }

    async fn crawl_seeds_parallel(
        &self,
        seeds: Vec<String>,
        max_depth: u32,
        run: &Arc<RunContext>,
    ) -> CrawlReport {
        let mut report = CrawlReport::default();
        let semaphore = Arc::new(Semaphore::new(self.config.crawler.max_concurrent_sites));
        let mut workers = JoinSet::new();

        for seed in seeds {
            let crawler = self.clone();
            let run = Arc::clone(run);
            let semaphore = Arc::clone(&semaphore);

            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = crawler.crawl_site_in_run(&seed, max_depth, &run).await;
                (seed, result)
            });
        }

        while let Some(joined) = workers.join_next().await {
            report.seeds += 1;
            match joined {
                Ok((_, Ok(site))) => report.merge(&site),
                Ok((seed, Err(e))) => {
                    tracing::error!("Failed to crawl site {}: {}", seed, e);
                    report.errors += 1;
                }
                Err(e) => {
                    tracing::error!("Site worker panicked: {}", e);
                    report.errors += 1;
                }
            }
        }

        report
    }

    /// Crawls one seed site to `max_depth` (the seed itself is depth 1)
    pub async fn crawl_site(&self, seed: &str, max_depth: u32) -> Result<CrawlReport> {
        let start = Instant::now();
        let run = RunContext::new(Duration::from_secs(self.config.crawler.run_timeout_secs));

        let mut report = self.crawl_site_in_run(seed, max_depth, &run).await?;
        report.seeds = 1;
        report.elapsed = start.elapsed();
        Ok(report)
    }

    async fn crawl_site_in_run(
        &self,
        seed: &str,
        max_depth: u32,
        run: &RunContext,
    ) -> Result<CrawlReport> {
        let seed_url = normalize_url(seed)?;
        let mut report = CrawlReport::default();

        tracing::info!("Crawling site {}", seed_url);

        let mut frontier: BTreeSet<String> = BTreeSet::new();
        frontier.insert(seed_url.to_string());
        let mut depth = 1;

        while depth <= max_depth && !frontier.is_empty() {
            let follow_links = depth < max_depth;
            let mut next_frontier = BTreeSet::new();

            tracing::debug!(
                "Depth {} of {} for {}: {} URL(s)",
                depth,
                max_depth,
                seed_url,
                frontier.len()
            );

            for url_str in &frontier {
                if run.is_expired() {
                    tracing::warn!("Run deadline reached while crawling {}", seed_url);
                    report.timed_out = true;
                    return Ok(report);
                }

                if !run.visit(url_str) {
                    continue;
                }

                let url = match Url::parse(url_str) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::debug!("Skipping unparseable URL {}: {}", url_str, e);
                        continue;
                    }
                };

                let Some(_guard) = self.locks.try_acquire(url.as_str()) else {
                    tracing::debug!("Skipping {}: being crawled by another run", url);
                    report.skipped += 1;
                    continue;
                };

                if self.is_recent(url.as_str())? {
                    tracing::debug!("Skipping {}: crawled within the recrawl window", url);
                    report.skipped += 1;
                    continue;
                }

                report.fetched += 1;
                match self.fetch_and_store(&url, follow_links).await {
                    Ok(outcome) => {
                        if outcome.unchanged {
                            report.unchanged += 1;
                        } else {
                            report.stored += 1;
                        }
                        next_frontier.extend(
                            outcome
                                .links
                                .into_iter()
                                .filter(|link| !run.was_visited(link)),
                        );
                    }
                    Err(e) if e.is_per_url() => {
                        report.errors += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        Ok(report)
    }

    /// Crawls one URL on demand
    ///
    /// The URL's host must be the host of a configured seed. Depth, the
    /// recrawl window and the enable switches do not apply. A fetch failure
    /// is recorded in the store and also returned.
    pub async fn crawl_single_url(&self, url: &str) -> Result<SingleCrawlResult> {
        let url = normalize_url(url)?;
        let host = extract_domain(&url).unwrap_or_default();

        if !self.allowed_hosts.contains(&host) {
            return Err(CrawlError::DisallowedDomain {
                url: url.to_string(),
                host,
            });
        }

        let _guard = self.acquire_lock_waiting(url.as_str()).await;
        let outcome = self.fetch_and_store(&url, false).await?;

        Ok(SingleCrawlResult {
            title: outcome.title,
            content_length: outcome.content_length,
            status: PageStatus::Crawled,
        })
    }

    async fn acquire_lock_waiting(&self, url: &str) -> UrlLockGuard {
        loop {
            if let Some(guard) = self.locks.try_acquire(url) {
                return guard;
            }
            tracing::debug!("Waiting for in-flight crawl of {}", url);
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Fetches one URL and writes the outcome to the store
    ///
    /// Per-URL failures are recorded with `mark_error` before being returned.
    async fn fetch_and_store(&self, url: &Url, follow_links: bool) -> Result<PageOutcome> {
        let key = url.as_str();
        let host = extract_domain(url).unwrap_or_default();

        self.lock_store()?.ensure_pending(key, Utc::now())?;
        self.throttle.wait_turn(&host).await;

        let page = match fetch_page(&self.client, key).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error_kind = e.kind(), "Failed to crawl {}: {}", key, e);
                self.lock_store()?
                    .mark_error(key, &e.to_string(), e.kind(), Utc::now())?;
                return Err(e);
            }
        };

        let extracted = self.extractor.extract(&page.body, key);

        let links = if follow_links {
            // Links are only followed while the page stays on its own host
            match Url::parse(&page.final_url) {
                Ok(final_url) if is_same_host(&final_url, url) => {
                    extract_links(&page.body, &final_url)
                }
                _ => BTreeSet::new(),
            }
        } else {
            BTreeSet::new()
        };

        let now = Utc::now();
        let content_length = extracted.content.chars().count();
        let unchanged = {
            let mut store = self.lock_store()?;
            let existing = store.get(key)?;
            let decision = should_store(&extracted.content, existing.as_ref());

            if decision.touch_only(existing.as_ref()) {
                store.touch(key, now)?;
                true
            } else {
                store.upsert(&CrawledPage {
                    url: key.to_string(),
                    title: extracted.title.clone(),
                    content: extracted.content,
                    metadata: extracted.metadata,
                    content_hash: Some(decision.hash),
                    status: PageStatus::Crawled,
                    crawled_at: Some(now),
                    updated_at: now,
                })?;
                false
            }
        };

        if unchanged {
            tracing::debug!("Unchanged: {}", key);
        } else {
            tracing::info!("Stored {} ({} chars)", key, content_length);
        }

        Ok(PageOutcome {
            title: extracted.title,
            content_length,
            unchanged,
            links,
        })
    }

    fn recrawl_window(&self) -> chrono::Duration {
        i64::try_from(self.config.crawler.recrawl_window_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }

    fn is_recent(&self, url: &str) -> Result<bool> {
        let window = self.recrawl_window();
        let existing = self.lock_store()?.get(url)?;
        Ok(existing
            .map(|page| change::is_recently_crawled(&page, Utc::now(), window))
            .unwrap_or(false))
    }

    /// Returns true if the URL was successfully crawled within the recrawl window
    pub fn is_recently_crawled(&self, url: &str) -> Result<bool> {
        let url = normalize_url(url)?;
        self.is_recent(url.as_str())
    }

    /// Counts per status, last crawl time and configuration flags
    pub fn get_crawl_status(&self) -> Result<CrawlStatus> {
        let store = self.lock_store()?;
        Ok(output::load_status(&*store, &self.config)?)
    }

    /// Deletes one URL's record, or every record when `url` is None
    ///
    /// Returns the number of records removed.
    pub fn clear_crawled_content(&self, url: Option<&str>) -> Result<u64> {
        let mut store = self.lock_store()?;
        let removed = match url {
            Some(url) => {
                let url = normalize_url(url)?;
                u64::from(store.delete(url.as_str())?)
            }
            None => store.clear()?,
        };

        tracing::info!("Cleared {} crawled record(s)", removed);
        Ok(removed)
    }

    /// Stored pages, most recently updated first
    pub fn list_crawled_content(&self, limit: usize, offset: usize) -> Result<Vec<PageSummary>> {
        let store = self.lock_store()?;
        Ok(output::list_crawled_content(&*store, limit, offset)?)
    }

    /// Keyword search over crawled pages for chat prompt context
    pub fn get_context(&self, query: &str, limit: usize) -> Result<Vec<ContextEntry>> {
        let store = self.lock_store()?;
        Ok(store
            .search(query, limit)?
            .into_iter()
            .map(ContextEntry::from)
            .collect())
    }

    /// Fetches a stored page by URL
    pub fn get_page(&self, url: &str) -> Result<Option<CrawledPage>> {
        let url = normalize_url(url)?;
        Ok(self.lock_store()?.get(url.as_str())?)
    }
}
