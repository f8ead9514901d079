use crate::UrlError;
use url::{form_urlencoded, Url};

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a URL into the canonical form used as the content store key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host (the `url` crate does this during parsing)
/// 4. Empty path becomes `/`; dot segments are resolved
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// 7. Sort remaining query parameters by key, keeping each one's original encoding
/// 8. Remove empty query string (trailing ?)
///
/// Trailing slashes are kept: `/dir/` and `/dir` resolve relative links differently.
///
/// # Examples
///
/// ```
/// use brainpool_crawler::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/docs/?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
            }
        }
        _ => return Err(UrlError::MissingDomain),
    }

    if url.path().is_empty() {
        url.set_path("/");
    }

    url.set_fragment(None);

    if let Some(query) = url.query().map(str::to_string) {
        let params = filter_and_sort_query_params(&query);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&params.join("&")));
        }
    }

    Ok(url)
}

/// Filters out tracking parameters and sorts the rest by decoded key
///
/// Segments are kept exactly as written: `%20` stays `%20` and a bare `flag`
/// gets no `=`.
fn filter_and_sort_query_params(query: &str) -> Vec<&str> {
    let mut params: Vec<(String, &str)> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| (decoded_key(segment), segment))
        .filter(|(key, _)| !is_tracking_param(key))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params.into_iter().map(|(_, segment)| segment).collect()
}

fn decoded_key(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
