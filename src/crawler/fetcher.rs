//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification into network, status and content-type failures

use crate::config::Config;
use crate::CrawlError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: String,
    /// Page body content
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent, timeouts, redirect cap)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use brainpool_crawler::config::load_config;
/// use brainpool_crawler::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("brainpool.toml")).unwrap();
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

    Client::builder()
        .user_agent(config.user_agent.header_value())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::limited(config.crawler.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if a Content-Type header value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("text/html")
}

/// Fetches a URL and returns its HTML body
///
/// # Error Classification
///
/// | Condition | Error |
/// |-----------|-------|
/// | Connection failure, timeout, redirect cap, body read failure | `Network` |
/// | Any status other than 200 | `HttpStatus` |
/// | Content-Type missing or not `text/html` | `UnsupportedContentType` |
///
/// There is no retry; the next scheduled run picks the URL up again.
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, CrawlError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| network_error(url, &e))?;

    let status = response.status();
    let final_url = response.url().to_string();

    if status != StatusCode::OK {
        return Err(CrawlError::HttpStatus {
            url: url.to_string(),
            code: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html_content_type(&content_type) {
        return Err(CrawlError::UnsupportedContentType {
            url: url.to_string(),
            content_type,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| network_error(url, &e))?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Classifies a transport-level failure
fn network_error(url: &str, e: &reqwest::Error) -> CrawlError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else if e.is_redirect() {
        format!("redirect limit exceeded: {}", e)
    } else if e.is_body() || e.is_decode() {
        format!("failed to read body: {}", e)
    } else {
        e.to_string()
    };

    CrawlError::Network {
        url: url.to_string(),
        message,
    }
}
