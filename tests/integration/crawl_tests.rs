//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the full
//! fetch, extract, compare and store cycle end-to-end.

use brainpool_crawler::config::{Config, CrawlerConfig, SitesConfig, StorageConfig, UserAgentConfig};
use brainpool_crawler::crawler::SharedStore;
use brainpool_crawler::{CrawlError, Crawler, MemoryStorage, PageStatus, SqliteStorage};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the given seeds
fn create_test_config(seeds: Vec<String>, max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            delay_ms: 0,
            request_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        storage: StorageConfig {
            database_path: "./unused.db".to_string(),
        },
        sites: SitesConfig { seeds },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn memory_crawler(config: Config) -> Crawler {
    Crawler::new(config, MemoryStorage::new()).expect("Failed to create crawler")
}

#[tokio::test]
async fn test_crawl_follows_same_host_links_to_max_depth() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <nav><a href="/page1">Page 1</a></nav>
            <main>Welcome home</main>
            <a href="page2">Page 2</a>
            <a href="https://other.example.org/x">Elsewhere</a>
            <a href="mailto:team@example.com">Mail</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
            <article>First page</article><a href="/deep">Deeper</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/page2",
        r#"<html><head><title>Page 2</title></head><body><article>Second page</article></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/deep"))
        .respond_with(html("<html><body>too deep</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 2));
    let report = crawler.crawl_all_sites().await.expect("Crawl failed");

    assert_eq!(report.seeds, 1);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.stored, 3);
    assert_eq!(report.errors, 0);
    assert!(!report.timed_out);

    let home = crawler
        .get_page(&format!("{}/", base))
        .unwrap()
        .expect("home page stored");
    assert_eq!(home.title, "Home");
    assert_eq!(home.content, "Welcome home");
    assert_eq!(home.status, PageStatus::Crawled);
    assert_eq!(home.metadata.get("crawled_from").unwrap(), &format!("{}/", base));

    let page1 = crawler.get_page(&format!("{}/page1", base)).unwrap().unwrap();
    assert_eq!(page1.content, "First page");
    assert!(crawler.get_page(&format!("{}/deep", base)).unwrap().is_none());
}

#[tokio::test]
async fn test_depth_one_fetches_only_the_seed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><main>Seed</main><a href="/page1">Next</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html("<html><body>Page 1</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 1));
    let report = crawler.crawl_all_sites().await.expect("Crawl failed");

    assert_eq!(report.fetched, 1);
    assert_eq!(crawler.get_crawl_status().unwrap().total_urls, 1);
}

#[tokio::test]
async fn test_identical_content_only_advances_updated_at() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        "<html><head><title>Stable</title></head><body><article>Same text</article></body></html>",
    )
    .await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 1));
    let url = format!("{}/", base);

    crawler.crawl_single_url(&url).await.expect("First crawl failed");
    let first = crawler.get_page(&url).unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let result = crawler.crawl_single_url(&url).await.expect("Second crawl failed");
    let second = crawler.get_page(&url).unwrap().unwrap();

    assert_eq!(result.status, PageStatus::Crawled);
    assert_eq!(second.content, first.content);
    assert_eq!(second.title, first.title);
    assert_eq!(second.content_hash, first.content_hash);
    assert_eq!(second.crawled_at, first.crawled_at);
    assert_eq!(second.metadata, first.metadata);
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_changed_content_rewrites_record() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "<html><head><title>Old</title></head><body><article>Old text</article></body></html>",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        "<html><head><title>New</title></head><body><article>New text</article></body></html>",
    )
    .await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 1));
    let url = format!("{}/", base);

    crawler.crawl_single_url(&url).await.unwrap();
    let before = crawler.get_page(&url).unwrap().unwrap();
    crawler.crawl_single_url(&url).await.unwrap();
    let after = crawler.get_page(&url).unwrap().unwrap();

    assert_ne!(after.content_hash, before.content_hash);
    assert_eq!(after.content, "New text");
    assert_eq!(after.title, "New");
    assert!(after.crawled_at > before.crawled_at);
}

#[tokio::test]
async fn test_http_404_records_error_and_keeps_content() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(html(
            "<html><head><title>Doc</title></head><body><article>Doc body</article></body></html>",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 1));
    let url = format!("{}/doc", base);

    crawler.crawl_single_url(&url).await.unwrap();
    let good = crawler.get_page(&url).unwrap().unwrap();

    let err = crawler.crawl_single_url(&url).await.unwrap_err();
    assert!(matches!(err, CrawlError::HttpStatus { code: 404, .. }));

    let failed = crawler.get_page(&url).unwrap().unwrap();
    assert_eq!(failed.status, PageStatus::Error);
    assert!(!failed.error_message().unwrap_or("").is_empty());
    assert_eq!(failed.metadata.get("error_kind").unwrap(), "http_status");
    assert_eq!(failed.content, good.content);
    assert_eq!(failed.content_hash, good.content_hash);
    assert_eq!(failed.crawled_at, good.crawled_at);
}

#[tokio::test]
async fn test_error_page_recovers_when_content_is_unchanged() {
    let server = MockServer::start().await;
    let base = server.uri();
    let body = "<html><body><article>Flaky page</article></body></html>";

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html(body))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", body).await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 1));
    let url = format!("{}/flaky", base);

    crawler.crawl_single_url(&url).await.unwrap();
    assert!(crawler.crawl_single_url(&url).await.is_err());
    assert_eq!(
        crawler.get_page(&url).unwrap().unwrap().status,
        PageStatus::Error
    );

    crawler.crawl_single_url(&url).await.unwrap();
    let recovered = crawler.get_page(&url).unwrap().unwrap();
    assert_eq!(recovered.status, PageStatus::Crawled);
    assert!(recovered.error_message().is_none());
}

#[tokio::test]
async fn test_disallowed_domain_is_rejected_without_storing() {
    let crawler = memory_crawler(create_test_config(
        vec!["https://example.com".to_string()],
        1,
    ));

    let err = crawler
        .crawl_single_url("https://not-allowed.test/x")
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::DisallowedDomain { .. }));
    assert_eq!(crawler.get_crawl_status().unwrap().total_urls, 0);
}

#[tokio::test]
async fn test_failures_do_not_abort_the_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><main>Index</main>
            <a href="/missing">Missing</a>
            <a href="/file.pdf">PDF</a>
            <a href="/ok">OK</a>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "application/pdf"))
        .mount(&server)
        .await;
    mount_page(&server, "/ok", "<html><body><article>Fine</article></body></html>").await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 2));
    let report = crawler.crawl_all_sites().await.expect("Crawl failed");

    assert_eq!(report.fetched, 4);
    assert_eq!(report.stored, 2);
    assert_eq!(report.errors, 2);

    let status = crawler.get_crawl_status().unwrap();
    assert_eq!(status.crawled_urls, 2);
    assert_eq!(status.error_urls, 2);
    assert_eq!(status.pending_urls, 0);
    assert_eq!(status.errors_by_kind.get("http_status"), Some(&1));
    assert_eq!(status.errors_by_kind.get("unsupported_content_type"), Some(&1));
}

#[tokio::test]
async fn test_recently_crawled_pages_are_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body><main>Once</main></body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 1));

    let first = crawler.crawl_all_sites().await.unwrap();
    assert_eq!(first.fetched, 1);
    assert!(crawler.is_recently_crawled(&format!("{}/", base)).unwrap());

    let second = crawler.crawl_all_sites().await.unwrap();
    assert_eq!(second.fetched, 0);
    assert_eq!(second.skipped, 1);
}

#[tokio::test]
async fn test_auto_crawl_respects_switch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<html><body>never</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", server.uri())], 1);
    config.crawler.auto_crawl_enabled = false;
    let crawler = memory_crawler(config);

    let report = crawler.run_auto_crawl().await.unwrap();
    assert_eq!(report.fetched, 0);
}

#[tokio::test]
async fn test_shared_links_are_fetched_once_per_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><body><main>Home</main><a href="/a">A</a><a href="/b">B</a></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/a",
        r#"<html><body><main>A</main><a href="/shared">S</a><a href="/">Home</a></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/b",
        r#"<html><body><main>B</main><a href="/shared">S</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(html("<html><body><main>Shared</main></body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    // A second seed on the same site must not refetch what the first covered
    let seeds = vec![format!("{}/", base), format!("{}/a", base)];
    let crawler = memory_crawler(create_test_config(seeds, 3));
    let report = crawler.crawl_all_sites().await.unwrap();

    assert_eq!(report.seeds, 2);
    assert_eq!(report.fetched, 4);
}

#[tokio::test]
async fn test_parallel_sites() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_page(&first, "/", "<html><body><main>First site</main></body></html>").await;
    mount_page(&second, "/", "<html><body><main>Second site</main></body></html>").await;

    let mut config = create_test_config(
        vec![format!("{}/", first.uri()), format!("{}/", second.uri())],
        1,
    );
    config.crawler.max_concurrent_sites = 2;
    let crawler = memory_crawler(config);

    let report = crawler.crawl_all_sites().await.unwrap();
    assert_eq!(report.seeds, 2);
    assert_eq!(report.stored, 2);

    let second_page = crawler
        .get_page(&format!("{}/", second.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(second_page.content, "Second site");
}

#[tokio::test]
async fn test_run_deadline_stops_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html(r#"<html><body><main>Slow</main><a href="/next">Next</a></body></html>"#)
                .set_delay(Duration::from_millis(1200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("<html><body>Next</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![format!("{}/", base)], 2);
    config.crawler.run_timeout_secs = 1;
    let crawler = memory_crawler(config);

    let report = crawler.crawl_all_sites().await.unwrap();
    assert!(report.timed_out);
    assert_eq!(report.fetched, 1);
}

#[tokio::test]
async fn test_manual_crawl_waits_for_scheduled_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    let url = format!("{}/", base);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html("<html><head><title>Slow</title></head><body><main>Slow page</main></body></html>")
                .set_delay(Duration::from_millis(400)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let crawler = memory_crawler(create_test_config(vec![url.clone()], 1));

    let scheduled = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawler.crawl_all_sites().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let manual = crawler
        .crawl_single_url(&url)
        .await
        .expect("Manual crawl failed");
    let waited = started.elapsed();

    let report = scheduled
        .await
        .expect("Scheduled run panicked")
        .expect("Scheduled run failed");
    assert_eq!(report.fetched, 1);
    assert_eq!(report.stored, 1);

    // Remaining scheduled fetch plus its own fetch; concurrent fetches would take ~400ms
    assert!(
        waited >= Duration::from_millis(600),
        "manual crawl did not wait: {:?}",
        waited
    );
    assert_eq!(manual.title, "Slow");

    let page = crawler.get_page(&url).unwrap().expect("page stored");
    assert_eq!(page.status, PageStatus::Crawled);
    assert_eq!(page.content, "Slow page");
    assert!(page.updated_at > page.crawled_at.expect("crawled_at set"));
}

#[tokio::test]
async fn test_scheduled_run_skips_url_in_flight() {
    let server = MockServer::start().await;
    let base = server.uri();
    let url = format!("{}/", base);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            html("<html><body><main>In flight</main></body></html>")
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let crawler = memory_crawler(create_test_config(vec![url.clone()], 1));

    let manual = {
        let crawler = crawler.clone();
        let url = url.clone();
        tokio::spawn(async move { crawler.crawl_single_url(&url).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let report = crawler.crawl_all_sites().await.expect("Crawl failed");
    assert_eq!(report.fetched, 0);
    assert_eq!(report.skipped, 1);

    manual
        .await
        .expect("Manual crawl panicked")
        .expect("Manual crawl failed");

    let page = crawler.get_page(&url).unwrap().expect("page stored");
    assert_eq!(page.status, PageStatus::Crawled);
    assert_eq!(page.content, "In flight");
}

#[tokio::test]
async fn test_search_and_listing() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body><main>Welcome</main>
            <a href="/pricing">Pricing</a><a href="/support">Support</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/pricing",
        "<html><head><title>Pricing</title></head><body><article>Plans start at ten dollars. Pricing is monthly.</article></body></html>",
    )
    .await;
    mount_page(
        &server,
        "/support",
        "<html><head><title>Support</title></head><body><article>Contact support about pricing questions.</article></body></html>",
    )
    .await;

    let crawler = memory_crawler(create_test_config(vec![format!("{}/", base)], 2));
    crawler.crawl_all_sites().await.unwrap();

    let hits = crawler.get_context("pricing", 5).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, format!("{}/pricing", base));
    assert_eq!(hits[0].title, "Pricing");

    assert_eq!(crawler.get_context("pricing", 1).unwrap().len(), 1);
    assert!(crawler.get_context("nonexistent", 5).unwrap().is_empty());

    let listing = crawler.list_crawled_content(10, 0).unwrap();
    assert_eq!(listing.len(), 3);
    assert!(listing.iter().all(|p| p.status == PageStatus::Crawled));
}

#[tokio::test]
async fn test_sqlite_store_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        r#"<html lang="en"><head><title>Persisted</title>
            <meta name="description" content="Stored on disk"></head>
            <body><main>Durable content</main></body></html>"#,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");

    {
        let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
        let crawler = Crawler::new(create_test_config(vec![format!("{}/", base)], 1), storage)
            .expect("Failed to create crawler");
        let report = crawler.crawl_all_sites().await.expect("Crawl failed");
        assert_eq!(report.stored, 1);
    }

    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen DB");
    let store: SharedStore = Arc::new(Mutex::new(storage));
    let crawler =
        Crawler::with_shared_store(create_test_config(vec![format!("{}/", base)], 1), store)
            .unwrap();

    let page = crawler.get_page(&format!("{}/", base)).unwrap().unwrap();
    assert_eq!(page.title, "Persisted");
    assert_eq!(page.content, "Durable content");
    assert_eq!(page.metadata.get("description").unwrap(), "Stored on disk");
    assert_eq!(page.metadata.get("language").unwrap(), "en");
    assert!(crawler.get_crawl_status().unwrap().last_crawl_timestamp.is_some());

    assert_eq!(crawler.clear_crawled_content(None).unwrap(), 1);
    assert_eq!(crawler.get_crawl_status().unwrap().total_urls, 0);
}
