//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the institution search endpoint
//! and run the full coordinator end-to-end.

use institution_crawler::config::{
    Config, CrawlerConfig, EndpointConfig, OutputConfig, QueryConfig, RulesConfig, UserAgentConfig,
};
use institution_crawler::crawler::{Coordinator, CrawlReport, QueryStatus};
use institution_crawler::output::load_snapshot;
use institution_crawler::{CrawlError, InstitutionId, Ruleset};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::future::pending;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IDENTITY: &str = "TestBot/1.0 (+https://example.com/contact; test@example.com)";

/// Creates a test configuration pointing at the mock server
///
/// Queries are the single letters `a`..(`letters`), pages hold 10 records
/// and the offset cap is 100, so a query makes at most 10 requests.
fn create_test_config(server_uri: &str, output_dir: &Path, letters: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 4,
            page_size: 10,
            max_offset: 100,
            max_consecutive_empty: 2,
            page_delay_ms: 0,
            rate_limit_cooldown_ms: 10,
            request_timeout_secs: 1,
            checkpoint_interval_secs: 60,
            max_query_length: 10,
        },
        endpoint: EndpointConfig {
            url: format!("{}/organizations", server_uri),
            country: "US".to_string(),
            locale: "en-us".to_string(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
            rotation: vec![],
        },
        output: OutputConfig {
            directory: output_dir.display().to_string(),
            file_prefix: "institutions".to_string(),
        },
        rules: RulesConfig {
            allowed_types: vec!["SCHOOL".to_string()],
            excluded_types: vec!["UNIVERSITY".to_string()],
            ..RulesConfig::default()
        },
        queries: QueryConfig {
            letters,
            bigram_first: 0,
            bigram_second: 0,
            keywords: vec![],
            include_empty: false,
        },
        countries: vec![],
    }
}

fn institution(id: u64, name: &str, kind: &str) -> Value {
    json!({"id": id, "name": name, "type": kind, "state": "OH"})
}

/// A full page of ten accepted schools with ids `first..first + 10`
fn full_page(first: u64) -> Value {
    let items: Vec<Value> = (first..first + 10)
        .map(|id| institution(id, &format!("School {}", id), "SCHOOL"))
        .collect();
    Value::Array(items)
}

/// Mounts an empty page for `name` at `offset` that answers after `delay`
async fn mount_slow_empty_page(server: &MockServer, name: &str, offset: u32, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("name", name))
        .and(query_param("offset", offset.to_string().as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mounts a page for `name` at `offset`
async fn mount_page(server: &MockServer, name: &str, offset: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("name", name))
        .and(query_param("offset", offset.to_string().as_str()))
        .and(query_param("country", "US"))
        .and(query_param("limit", "10"))
        .and(query_param("locale", "en-us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Every request not matched by an earlier mock gets an empty page
async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

async fn run_crawl(config: Config) -> CrawlReport {
    Coordinator::new(config)
        .expect("Failed to build coordinator")
        .run(pending())
        .await
        .expect("Crawl failed")
}

#[tokio::test]
async fn test_full_crawl_dedups_and_filters() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &server,
        "a",
        0,
        json!([
            institution(1, "Oak Elementary", "SCHOOL"),
            institution(2, "State University", "UNIVERSITY"),
            institution(3, "Pine High", "HIGH_SCHOOL"),
            institution(4, "Cedar School", "SCHOOL"),
            institution(5, "Школа 12", "SCHOOL"),
            institution(6, "Birch Academy", "SCHOOL"),
        ]),
    )
    .await;
    mount_page(
        &server,
        "b",
        0,
        json!([
            institution(1, "Oak Elementary", "SCHOOL"),
            institution(7, "alder prep", "SCHOOL"),
        ]),
    )
    .await;
    mount_empty_fallback(&server).await;

    let config = create_test_config(&server.uri(), dir.path(), 2);
    let ruleset = Ruleset::from_config(&config.rules);
    let report = run_crawl(config).await;

    assert!(report.succeeded());
    assert!(!report.interrupted);
    assert_eq!(report.failed_tasks, 0);
    assert_eq!(report.count_status(QueryStatus::Completed), 2);

    // "a": full page then two empties; "b": short page then one empty
    assert_eq!(report.stats.total_requests, 5);
    assert_eq!(report.stats.successful_requests, 5);
    assert_eq!(report.stats.total_found, 8);
    assert_eq!(report.stats.filtered_out, 3);
    assert_eq!(report.stats.duplicates_removed, 1);
    assert_eq!(report.stats.institutions_saved, 4);
    assert_eq!(report.stats.errors, 0);

    let path = dir.path().join("institutions_us.json");
    assert_eq!(report.output_path, path);
    assert_eq!(report.records_written, 4);

    let records = load_snapshot(&path).unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        ["alder prep", "Birch Academy", "Cedar School", "Oak Elementary"]
    );

    let ids: HashSet<&InstitutionId> = records.iter().map(|r| &r.id).collect();
    assert_eq!(ids.len(), records.len());
    assert!(records.iter().all(|r| ruleset.accepts(r)));
    assert!(records.iter().all(|r| r.country == "US"));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.is_ascii());
}

#[tokio::test]
async fn test_data_envelope_is_unwrapped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &server,
        "a",
        0,
        json!({"data": [institution(10, "Maple School", "SCHOOL")], "total": 1}),
    )
    .await;
    mount_empty_fallback(&server).await;

    let report = run_crawl(create_test_config(&server.uri(), dir.path(), 1)).await;

    assert_eq!(report.stats.institutions_saved, 1);
    let records = load_snapshot(&report.output_path).unwrap();
    assert_eq!(records[0].id, InstitutionId::Numeric(10));
    assert_eq!(records[0].query_found, "a");
}

#[tokio::test]
async fn test_rate_limited_page_is_empty_and_counted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    mount_empty_fallback(&server).await;

    let report = run_crawl(create_test_config(&server.uri(), dir.path(), 1)).await;

    assert_eq!(report.stats.total_requests, 2);
    assert_eq!(report.stats.rate_limited, 1);
    assert_eq!(report.stats.errors, 0);
    assert_eq!(report.count_status(QueryStatus::Completed), 1);
    assert_eq!(report.records_written, 0);
}

#[tokio::test]
async fn test_timeout_yields_empty_page_and_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([institution(1, "Slow School", "SCHOOL")]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_empty_fallback(&server).await;

    let report = run_crawl(create_test_config(&server.uri(), dir.path(), 1)).await;

    assert_eq!(report.stats.errors, 1);
    assert_eq!(report.stats.total_requests, 2);
    assert_eq!(report.stats.institutions_saved, 0);
    assert_eq!(report.failed_tasks, 0);
    assert_eq!(report.count_status(QueryStatus::Completed), 1);
}

#[tokio::test]
async fn test_server_errors_and_malformed_bodies_do_not_abort() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("name", "a"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .and(query_param("name", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "c",
        0,
        json!([institution(3, "Willow School", "SCHOOL")]),
    )
    .await;
    mount_empty_fallback(&server).await;

    let report = run_crawl(create_test_config(&server.uri(), dir.path(), 3)).await;

    // Two 500s for "a"; malformed bodies are empty pages, not errors
    assert_eq!(report.stats.errors, 2);
    assert_eq!(report.stats.total_requests, 6);
    assert_eq!(report.stats.successful_requests, 2);
    assert_eq!(report.count_status(QueryStatus::Completed), 3);
    assert_eq!(report.stats.institutions_saved, 1);
    assert!(report.succeeded());
}

#[tokio::test]
async fn test_full_pages_stop_at_offset_cap() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let page: Vec<Value> = (1..=10)
        .map(|id| institution(id, &format!("School Number {}", id), "SCHOOL"))
        .collect();
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(page)))
        .mount(&server)
        .await;

    let report = run_crawl(create_test_config(&server.uri(), dir.path(), 1)).await;

    assert_eq!(report.stats.total_requests, 10);
    assert_eq!(report.stats.max_offset_reached, 1);
    assert_eq!(report.count_status(QueryStatus::OffsetCapReached), 1);
    assert_eq!(report.stats.institutions_saved, 10);
    assert_eq!(report.stats.duplicates_removed, 90);
}

#[tokio::test]
async fn test_overlong_queries_are_skipped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_empty_fallback(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path(), 0);
    config.queries.keywords = vec!["high school".to_string(), "academy".to_string()];

    let report = run_crawl(config).await;

    assert_eq!(report.stats.queries_skipped, 1);
    assert_eq!(report.count_status(QueryStatus::Skipped), 1);
    // Only "academy" hits the endpoint
    assert_eq!(report.stats.total_requests, 2);
}

#[tokio::test]
async fn test_user_agents_rotate() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(header("user-agent", IDENTITY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("user-agent", "AgentTwo/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), dir.path(), 1);
    config.user_agent.rotation = vec!["AgentTwo/1.0".to_string()];

    let report = run_crawl(config).await;
    assert_eq!(report.stats.total_requests, 2);

    server.verify().await;
}

#[tokio::test]
async fn test_previous_output_is_replaced() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("institutions_us.json");
    std::fs::write(&stale, r#"[{"id": 99, "name": "Stale School"}]"#).unwrap();

    mount_page(
        &server,
        "a",
        0,
        json!([institution(1, "Fresh School", "SCHOOL")]),
    )
    .await;
    mount_empty_fallback(&server).await;

    run_crawl(create_test_config(&server.uri(), dir.path(), 1)).await;

    let records = load_snapshot(&stale).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Fresh School");
}

#[tokio::test]
async fn test_interrupt_before_start_abandons_queued_queries() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_empty_fallback(&server).await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri(), dir.path(), 5)).unwrap();
    let report = coordinator.run(std::future::ready(())).await.unwrap();

    assert!(report.interrupted);
    assert!(report.succeeded());
    assert_eq!(report.failed_tasks, 0);
    assert_eq!(report.outcomes.len(), 5);
    assert!(report.outcomes.iter().all(|o| matches!(
        o.status,
        QueryStatus::Interrupted | QueryStatus::Completed
    )));
}

#[tokio::test]
async fn test_interrupt_keeps_records_gathered_so_far() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(&server, "a", 0, full_page(1)).await;
    mount_slow_empty_page(&server, "a", 10, Duration::from_secs(2)).await;
    mount_empty_fallback(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path(), 1);
    config.crawler.request_timeout_secs = 5;
    let coordinator = Coordinator::new(config).unwrap();
    let output = coordinator.output_path().to_path_buf();

    let report = coordinator
        .run(tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    assert!(report.interrupted);
    assert!(report.succeeded());
    assert_eq!(report.records_written, 10);
    assert_eq!(report.count_status(QueryStatus::Interrupted), 1);

    let records = load_snapshot(&output).unwrap();
    assert_eq!(records.len(), 10);
    assert!(records.iter().any(|r| r.id == InstitutionId::Numeric(1)));
}

#[tokio::test]
async fn test_checkpoint_written_while_running() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_page(&server, "a", 0, full_page(1)).await;
    mount_slow_empty_page(&server, "a", 10, Duration::from_millis(2500)).await;
    mount_empty_fallback(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path(), 1);
    config.crawler.request_timeout_secs = 5;
    config.crawler.checkpoint_interval_secs = 1;
    let coordinator = Coordinator::new(config).unwrap();
    let output = coordinator.output_path().to_path_buf();

    let check = async {
        tokio::time::sleep(Duration::from_millis(1600)).await;
        load_snapshot(&output).map(|records| records.len()).ok()
    };
    let (report, mid_run) = tokio::join!(coordinator.run(pending()), check);
    let report = report.unwrap();

    assert_eq!(mid_run, Some(10));
    assert!(!report.interrupted);
    assert_eq!(report.records_written, 10);
    assert_eq!(load_snapshot(&output).unwrap().len(), 10);
}

#[tokio::test]
async fn test_coordinator_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config("http://127.0.0.1:9", dir.path(), 1);
    config.crawler.checkpoint_interval_secs = 0;

    assert!(matches!(
        Coordinator::new(config),
        Err(CrawlError::Config(_))
    ));
}
