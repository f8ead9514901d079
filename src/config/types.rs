use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub sites: SitesConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Master switch; when false no crawl runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether scheduled runs should crawl
    #[serde(default = "default_true")]
    pub auto_crawl_enabled: bool,

    /// Maximum depth to crawl, the seed itself being depth 1
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Pause between requests to the same host (milliseconds)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// URLs crawled more recently than this are not fetched again
    #[serde(default = "default_recrawl_window_hours")]
    pub recrawl_window_hours: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum redirects followed for a single fetch
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Deadline for a whole crawl run (seconds)
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Number of seed sites crawled in parallel
    #[serde(default = "default_max_concurrent_sites")]
    pub max_concurrent_sites: usize,

    /// Main-content selectors, tried in order
    #[serde(default = "default_content_selectors")]
    pub content_selectors: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Seed sites to crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitesConfig {
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_crawl_enabled: true,
            max_depth: default_max_depth(),
            delay_ms: default_delay_ms(),
            recrawl_window_hours: default_recrawl_window_hours(),
            request_timeout_secs: default_request_timeout_secs(),
            max_redirects: default_max_redirects(),
            run_timeout_secs: default_run_timeout_secs(),
            max_concurrent_sites: default_max_concurrent_sites(),
            content_selectors: default_content_selectors(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_recrawl_window_hours() -> u64 {
    24
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_run_timeout_secs() -> u64 {
    3600
}

fn default_max_concurrent_sites() -> usize {
    1
}

/// Default main-content selector priority
pub fn default_content_selectors() -> Vec<String> {
    [
        "main", "article", ".content", ".main", ".post", ".entry", "#content", "#main",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
