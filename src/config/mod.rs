//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! plus the JSON seed-list format used by the settings layer.
//!
//! # Example
//!
//! ```no_run
//! use brainpool_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_content_selectors, Config, CrawlerConfig, SitesConfig, StorageConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_seed_list_json,
    parse_seed_list_json,
};
pub use validation::validate;
