//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::time::Duration;
use tempfile::TempDir;
use web_crawler::config::{Config, CrawlerConfig, OutputConfig};
use web_crawler::crawler::{
    Coordinator, PageRecord, CONNECTION_ERROR, DIRECT_ACCESS, FETCH_FAILED, NO_H1,
};
use web_crawler::output::{read_records, FinalizedRun, RunManifest, RunPaths, CSV_FIELDS};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short delays
fn create_test_config(start_url: &str, output: &TempDir) -> Config {
    Config {
        start_url: start_url.to_string(),
        user_agent: "TestBot/1.0".to_string(),
        use_robots_txt: false,
        crawler: CrawlerConfig {
            max_depth: 3,
            max_urls: 100,
            workers: 4,
            batch_delay_ms: 10,
            max_attempts: 3,
            retry_delay_ms: 10,
            request_timeout_ms: 2000,
            shared_fetch: false,
        },
        output: OutputConfig {
            directory: output.path().to_string_lossy().into_owned(),
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn crawl(config: Config, output: &TempDir) -> (FinalizedRun, Vec<PageRecord>) {
    let paths = RunPaths::new(output.path(), "20240101");
    let coordinator = Coordinator::with_paths(config, paths).expect("Failed to create coordinator");
    let run = coordinator.run().await.expect("Crawl failed");
    let records = read_records(&run.final_path).expect("Failed to read result");
    (run, records)
}

fn find<'a>(records: &'a [PageRecord], url: &str) -> &'a PageRecord {
    records
        .iter()
        .find(|r| r.url == url)
        .unwrap_or_else(|| panic!("No record for {}", url))
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <h1>Welcome</h1>
        <a href="/a">A</a>
        <a href="/b?ref=nav#top">B</a>
        <a href="/a/">A again</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &mock_server,
        "/a",
        r#"<html><head><title>Page A</title>
        <meta name="description" content="About A">
        <link rel="canonical" href="/a"></head>
        <body><h1>A</h1><a href="/b">B</a></body></html>"#,
    )
    .await;
    mount_page(
        &mock_server,
        "/b",
        "<html><head><title>Page B</title></head><body><h1>B</h1></body></html>",
    )
    .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &output);
    let (run, records) = crawl(config, &output).await;

    let home = format!("{}/", base_url);
    let a = format!("{}/a", base_url);
    let b = format!("{}/b", base_url);

    assert_eq!(records.len(), 3, "one record per URL: {:?}", records);

    let root = find(&records, &home);
    assert_eq!(root.status_code, 200);
    assert_eq!(root.title, "Home");
    assert_eq!(root.h1, "Welcome");
    assert_eq!(root.referrer, DIRECT_ACCESS);
    assert_eq!(root.depth, 0);

    let page_a = find(&records, &a);
    assert_eq!(page_a.depth, 1);
    assert_eq!(page_a.referrer, home);
    assert_eq!(page_a.meta_description, "About A");
    assert_eq!(page_a.canonical_url, a);

    let page_b = find(&records, &b);
    assert_eq!(page_b.depth, 1);
    assert_eq!(page_b.referrer, home);

    // Sorted by url
    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    let mut sorted = urls.clone();
    sorted.sort();
    assert_eq!(urls, sorted);

    // Latest copy and manifest
    assert_eq!(
        std::fs::read(&run.final_path).unwrap(),
        std::fs::read(&run.latest_path).unwrap()
    );
    let manifest = RunManifest::load(&run.manifest_path).unwrap();
    assert_eq!(manifest.current_path, "crawl_result_20240101.csv");
    assert_eq!(manifest.record_count, 3);
    assert_eq!(manifest.start_url, home);

    let header = std::fs::read_to_string(&run.final_path).unwrap();
    assert!(header.starts_with(&CSV_FIELDS.join(",")));
}

#[tokio::test]
async fn test_ignored_links_not_admitted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body>
        <a href="mailto:test@example.com">Mail</a>
        <a href="tel:+15555550100">Call</a>
        <a href="/logo.png">Logo</a>
        <a href="/cdn-cgi/l/email-protection">Protected</a>
        <a href="https://other.example.org/page">Elsewhere</a>
        <a href="/real">Real</a>
        </body></html>"#,
    )
    .await;
    mount_page(&mock_server, "/real", "<title>Real</title>").await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &output);
    let (_, records) = crawl(config, &output).await;

    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/", base_url), format!("{}/real", base_url)]);
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body><a href="/report">Report</a><a href="/missing">Missing</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/report"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4 <title>Hidden</title>".to_vec(), "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &output);
    let (_, records) = crawl(config, &output).await;

    let report = find(&records, &format!("{}/report", base_url));
    assert_eq!(report.status_code, 200);
    assert!(report.title.contains("application/pdf"));
    assert!(report.h1.contains("application/pdf"));
    assert!(report.meta_description.contains("application/pdf"));
    assert!(!report.title.contains("Hidden"));

    // Unmatched wiremock paths answer 404
    let missing = find(&records, &format!("{}/missing", base_url));
    assert_eq!(missing.status_code, 404);
    assert_eq!(missing.title, "HTTP error 404");
}

#[tokio::test]
async fn test_title_without_h1() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "<html><head><title>Foo</title></head><body></body></html>").await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &output);
    let (_, records) = crawl(config, &output).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Foo");
    assert_eq!(records[0].h1, NO_H1);
}

#[tokio::test]
async fn test_timeouts_exhaust_retries() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<title>Slow</title>").set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &output);
    config.crawler.request_timeout_ms = 100;
    config.crawler.shared_fetch = true;

    let started = std::time::Instant::now();
    let (_, records) = crawl(config, &output).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status_code, 0);
    assert_eq!(records[0].title, FETCH_FAILED);
    assert_eq!(records[0].h1, FETCH_FAILED);
    // Three timed-out attempts
    assert!(started.elapsed() >= Duration::from_millis(300));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn test_unreachable_start_url() {
    let output = TempDir::new().unwrap();
    let mut config = create_test_config("http://127.0.0.1:9", &output);
    config.crawler.max_attempts = 2;

    let (run, records) = crawl(config, &output).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "http://127.0.0.1:9/");
    assert_eq!(records[0].status_code, -1);
    assert_eq!(records[0].title, CONNECTION_ERROR);
    assert_eq!(run.statistics.connection_failures, 1);
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", r#"<a href="/level1">1</a>"#).await;
    mount_page(&mock_server, "/level1", r#"<a href="/level2">2</a>"#).await;
    mount_page(&mock_server, "/level2", r#"<a href="/level3">3</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/level3"))
        .respond_with(html("<title>Too deep</title>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &output);
    config.crawler.max_depth = 2;
    let (_, records) = crawl(config, &output).await;

    let depths: Vec<(String, u32)> = records.iter().map(|r| (r.url.clone(), r.depth)).collect();
    assert_eq!(
        depths,
        vec![
            (format!("{}/", base_url), 0),
            (format!("{}/level1", base_url), 1),
            (format!("{}/level2", base_url), 2),
        ]
    );
    assert_eq!(
        find(&records, &format!("{}/level2", base_url)).referrer,
        format!("{}/level1", base_url)
    );
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/",
        r#"<a href="/public">Public</a><a href="/private">Private</a>"#,
    )
    .await;
    mount_page(&mock_server, "/public", "<title>Public</title>").await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html("<title>Private</title>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &output);
    config.use_robots_txt = true;
    let (_, records) = crawl(config, &output).await;

    assert_eq!(records.len(), 3);
    let private = find(&records, &format!("{}/private", base_url));
    assert_eq!(private.status_code, 0);
    assert_eq!(private.title, FETCH_FAILED);
    assert_eq!(find(&records, &format!("{}/public", base_url)).title, "Public");
}

#[tokio::test]
async fn test_dual_fetch_requests_each_page_twice() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<title>Home</title><a href="/leaf">Leaf</a>"#))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/leaf"))
        .respond_with(html("<title>Leaf</title>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &output);
    let (_, records) = crawl(config, &output).await;

    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_shared_fetch_matches_dual_fetch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<title>Home</title><h1>Hi</h1><a href="/x">X</a><a href="/y">Y</a>"#,
        ))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/x", r#"<title>X</title><a href="/y">Y</a>"#).await;
    mount_page(&mock_server, "/y", "<title>Y</title>").await;

    let dual_output = TempDir::new().unwrap();
    let dual_config = create_test_config(&base_url, &dual_output);
    let (_, dual) = crawl(dual_config, &dual_output).await;
    let dual_requests = mock_server.received_requests().await.unwrap().len();

    let shared_output = TempDir::new().unwrap();
    let mut shared_config = create_test_config(&base_url, &shared_output);
    shared_config.crawler.shared_fetch = true;
    let (_, shared) = crawl(shared_config, &shared_output).await;
    let shared_requests = mock_server.received_requests().await.unwrap().len() - dual_requests;

    assert_eq!(dual, shared);
    assert_eq!(shared_requests, 3);
    assert!(dual_requests > shared_requests);
}

#[tokio::test]
async fn test_url_budget_stops_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/one">1</a><a href="/two">2</a><a href="/three">3</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/three"))
        .respond_with(html("<title>Three</title>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &output);
    config.crawler.max_urls = 2;
    let (run, records) = crawl(config, &output).await;

    // Budget spent by the first batch; queued URLs are never dispatched
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("{}/", base_url));
    assert_eq!(run.statistics.total_records, 1);
}
