//! Main-content extraction from HTML pages
//!
//! Turns a fetched document into a title, a block of cleaned text suitable for
//! prompt context, and a small metadata map.

use crate::storage::PageMetadata;
use crate::ConfigError;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text never counts as page content
const NOISE_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "aside"];

/// Link-text filler stripped from extracted content
const BOILERPLATE_PATTERN: &str = r"(?i)\b(?:click here|read more|continue reading)\b";

/// `<meta name=...>` keys copied into metadata under the same name
const META_NAMES: &[&str] = &["description", "keywords"];

/// `<meta property=...>` keys and the metadata key each is stored under
const META_PROPERTIES: &[(&str, &str)] = &[
    ("og:title", "og_title"),
    ("og:description", "og_description"),
];

/// The result of extracting one page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    pub metadata: PageMetadata,
}

/// Extracts title, main text and metadata from HTML
///
/// Selectors are compiled once; the extractor is shared by every crawl worker.
#[derive(Debug)]
pub struct ContentExtractor {
    content_selectors: Vec<Selector>,
    title_selector: Selector,
    body_selector: Selector,
    html_selector: Selector,
    meta_selector: Selector,
    boilerplate: Regex,
}

impl ContentExtractor {
    /// Compiles the main-content selectors, in priority order
    ///
    /// # Arguments
    ///
    /// * `selectors` - CSS selectors tried in order when locating the main content
    ///
    /// # Returns
    ///
    /// * `Ok(ContentExtractor)` - All selectors compiled
    /// * `Err(ConfigError::InvalidSelector)` - A selector is not valid CSS
    pub fn new(selectors: &[String]) -> Result<Self, ConfigError> {
        let content_selectors = selectors
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            content_selectors,
            title_selector: compile("title")?,
            body_selector: compile("body")?,
            html_selector: compile("html")?,
            meta_selector: compile("meta[content]")?,
            boilerplate: Regex::new(BOILERPLATE_PATTERN)
                .map_err(|e| ConfigError::Validation(e.to_string()))?,
        })
    }

    /// Extracts a page, stamping the metadata with the current time
    pub fn extract(&self, html: &str, source_url: &str) -> ExtractedContent {
        self.extract_at(html, source_url, Utc::now())
    }

    /// Extracts a page, stamping the metadata with `now`
    ///
    /// Parsing is lenient: malformed markup still yields whatever text the
    /// parser recovers, and an empty document yields empty content.
    pub fn extract_at(&self, html: &str, source_url: &str, now: DateTime<Utc>) -> ExtractedContent {
        let document = Html::parse_document(html);

        let title = self
            .extract_title(&document)
            .unwrap_or_else(|| fallback_title(source_url));
        let content = self.extract_main_text(&document);

        let mut metadata = self.extract_metadata(&document);
        metadata.insert("crawled_from".to_string(), source_url.to_string());
        metadata.insert("crawl_timestamp".to_string(), now.to_rfc3339());

        ExtractedContent {
            title,
            content,
            metadata,
        }
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        document
            .select(&self.title_selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")))
            .filter(|s| !s.is_empty())
    }

    /// Text of the first non-empty priority match, else of `<body>`
    fn extract_main_text(&self, document: &Html) -> String {
        for selector in &self.content_selectors {
            for element in document.select(selector) {
                let text = self.clean_text(&visible_text(element));
                if !text.is_empty() {
                    return text;
                }
            }
        }

        document
            .select(&self.body_selector)
            .next()
            .map(|body| self.clean_text(&visible_text(body)))
            .unwrap_or_default()
    }

    /// Collapses whitespace and strips link-text filler
    pub fn clean_text(&self, raw: &str) -> String {
        let collapsed = collapse_whitespace(raw);
        let stripped = self.boilerplate.replace_all(&collapsed, " ");
        collapse_whitespace(&stripped)
    }

    fn extract_metadata(&self, document: &Html) -> PageMetadata {
        let mut metadata = PageMetadata::new();

        for element in document.select(&self.meta_selector) {
            let attrs = element.value();
            let Some(value) = attrs.attr("content").map(str::trim).filter(|v| !v.is_empty())
            else {
                continue;
            };

            if let Some(name) = attrs.attr("name") {
                let name = name.trim().to_ascii_lowercase();
                if META_NAMES.contains(&name.as_str()) {
                    metadata.entry(name).or_insert_with(|| value.to_string());
                }
            }

            if let Some(property) = attrs.attr("property") {
                let property = property.trim().to_ascii_lowercase();
                if let Some((_, key)) = META_PROPERTIES.iter().find(|(p, _)| *p == property) {
                    metadata
                        .entry(key.to_string())
                        .or_insert_with(|| value.to_string());
                }
            }
        }

        if let Some(lang) = document
            .select(&self.html_selector)
            .next()
            .and_then(|html| html.value().attr("lang"))
            .map(str::trim)
            .filter(|l| !l.is_empty())
        {
            metadata.insert("language".to_string(), lang.to_string());
        }

        metadata
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{}: {}", selector, e)))
}

/// Joins the text nodes under `root`, skipping anything inside noise elements
fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let in_noise = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| NOISE_TAGS.contains(&el.name()))
        });

        if !in_noise {
            parts.push(&**text);
        }
    }

    parts.join(" ")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Host of the source URL, or the URL itself when it has none
fn fallback_title(source_url: &str) -> String {
    Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| source_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_content_selectors;

    const SOURCE: &str = "https://example.com/page";

    fn extractor() -> ContentExtractor {
        ContentExtractor::new(&default_content_selectors()).unwrap()
    }

    #[test]
    fn test_nav_text_is_excluded() {
        let html = "<html><body><nav>Menu</nav><article>Hello</article></body></html>";
        let extracted = extractor().extract(html, SOURCE);
        assert!(extracted.content.contains("Hello"));
        assert!(!extracted.content.contains("Menu"));
    }

    #[test]
    fn test_body_fallback_skips_noise() {
        let html = r#"<html><head><style>p { color: red; }</style></head><body>
            <header>Site Header</header>
            <p>First paragraph.</p>
            <script>var x = 1;</script>
            <aside>Related links</aside>
            <p>Second paragraph.</p>
            <footer>Copyright</footer>
        </body></html>"#;

        let extracted = extractor().extract(html, SOURCE);
        assert_eq!(extracted.content, "First paragraph. Second paragraph.");
    }

    #[test]
    fn test_selector_priority() {
        let html = r#"<html><body>
            <div class="content">From content div</div>
            <main>From main</main>
        </body></html>"#;

        let extracted = extractor().extract(html, SOURCE);
        assert_eq!(extracted.content, "From main");
    }

    #[test]
    fn test_empty_match_falls_through() {
        let html = r#"<html><body>
            <main>   <nav>Only navigation</nav>   </main>
            <article>Real article</article>
        </body></html>"#;

        let extracted = extractor().extract(html, SOURCE);
        assert_eq!(extracted.content, "Real article");
    }

    #[test]
    fn test_custom_selectors() {
        let selectors = vec!["#docs".to_string()];
        let extractor = ContentExtractor::new(&selectors).unwrap();
        let html = r#"<html><body><main>Main</main><div id="docs">Docs body</div></body></html>"#;

        assert_eq!(extractor.extract(html, SOURCE).content, "Docs body");
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let result = ContentExtractor::new(&["main[".to_string()]);
        assert!(matches!(result, Err(ConfigError::InvalidSelector(_))));
    }

    #[test]
    fn test_adjacent_blocks_do_not_fuse() {
        let html = "<html><body><main><p>one</p><p>two</p></main></body></html>";
        assert_eq!(extractor().extract(html, SOURCE).content, "one two");
    }

    #[test]
    fn test_boilerplate_phrases_removed() {
        let html = r#"<html><body><article>
            Our new release is out. <a href="/r">Read more</a>
            Details inside, CLICK HERE to download. Continue reading
        </article></body></html>"#;

        let extracted = extractor().extract(html, SOURCE);
        assert_eq!(
            extracted.content,
            "Our new release is out. Details inside, to download."
        );
    }

    #[test]
    fn test_boilerplate_needs_word_boundaries() {
        let extractor = extractor();
        assert_eq!(extractor.clean_text("threaded more"), "threaded more");
        assert_eq!(extractor.clean_text("  a \n\t b  "), "a b");
    }

    #[test]
    fn test_title_and_fallback() {
        let with_title = "<html><head><title>  My   Page </title></head><body>x</body></html>";
        assert_eq!(extractor().extract(with_title, SOURCE).title, "My Page");

        let without = "<html><head><title>   </title></head><body>x</body></html>";
        assert_eq!(extractor().extract(without, SOURCE).title, "example.com");
    }

    #[test]
    fn test_metadata_extraction() {
        let html = r#"<html lang="en"><head>
            <meta name="description" content="A test page">
            <meta name="keywords" content="test, page">
            <meta property="og:title" content="OG Title">
            <meta property="og:description" content="">
            <meta name="viewport" content="width=device-width">
        </head><body>x</body></html>"#;

        let now = Utc::now();
        let extracted = extractor().extract_at(html, SOURCE, now);
        let meta = &extracted.metadata;

        assert_eq!(meta.get("description").unwrap(), "A test page");
        assert_eq!(meta.get("keywords").unwrap(), "test, page");
        assert_eq!(meta.get("og_title").unwrap(), "OG Title");
        assert_eq!(meta.get("language").unwrap(), "en");
        assert_eq!(meta.get("crawled_from").unwrap(), SOURCE);
        assert_eq!(meta.get("crawl_timestamp").unwrap(), &now.to_rfc3339());
        assert!(!meta.contains_key("og_description"));
        assert!(!meta.contains_key("viewport"));
    }

    #[test]
    fn test_malformed_html_is_lenient() {
        let html = "<html><body><article><p>Unclosed <b>bold text";
        let extracted = extractor().extract(html, SOURCE);
        assert_eq!(extracted.content, "Unclosed bold text");
    }

    #[test]
    fn test_empty_document() {
        let extracted = extractor().extract("", SOURCE);
        assert_eq!(extracted.content, "");
        assert_eq!(extracted.title, "example.com");
    }
}
