//! Same-site link extraction
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` tags anywhere in the document
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs
//! - Fragment-only links (same page anchors)
//! - Links to any host other than the page's own host

use crate::url::{is_same_host, normalize_url};
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts the canonical same-host links of a page
///
/// Relative hrefs are resolved against `base_url` per RFC 3986, so `page2` on
/// `https://example.com/dir/` becomes `https://example.com/dir/page2`.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL the page was fetched from
///
/// # Returns
///
/// The normalized, deduplicated set of links on the same host
///
/// # Example
///
/// ```
/// use brainpool_crawler::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/about">About</a><a href="https://other.com/x">Other</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base);
/// assert!(links.contains("https://example.com/about"));
/// assert_eq!(links.len(), 1);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> BTreeSet<String> {
    let mut links = BTreeSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };
    let document = Html::parse_document(html);

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(link) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            links.insert(link);
        }
    }

    links
}

/// Resolves one href to a normalized same-host URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    let normalized = normalize_url(absolute.as_str()).ok()?;

    if !is_same_host(&normalized, base_url) {
        return None;
    }

    Some(normalized.to_string())
}
