// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    context, report_with, FailingStorage, StubDiscovery, StubFetcher, StubScreenshotter,
    MARKET_PAGE,
};
use onionscan::config::settings::HttpSettings;
use onionscan::domain::repositories::storage_repository::StorageRepository;
use onionscan::engines::reqwest_engine::FetchClient;
use onionscan::infrastructure::report::RunLog;
use onionscan::infrastructure::storage::{InMemoryStorage, LocalStorage};
use onionscan::workers::ScanOrchestrator;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_artifacts_are_written_per_target() {
    let storage = InMemoryStorage::new();
    let fetcher = Arc::new(StubFetcher::new().page("http://abc.onion/shop", 200, MARKET_PAGE));
    let discovery = Arc::new(StubDiscovery::available(fetcher));
    let shooter = Arc::new(StubScreenshotter::succeeding());
    let report = report_with(Arc::new(storage.clone()), RunLog::disabled());

    let ctx = context(discovery, report).with_screenshotter(shooter.clone());
    let summary = ScanOrchestrator::new(ctx)
        .run(vec!["abc.onion/shop".to_string()], 1)
        .await;

    assert_eq!(summary.success, 1);
    assert_eq!(shooter.calls(), 1);
    assert_eq!(
        storage.keys().await,
        vec![
            "abc.onion_shop.html".to_string(),
            "abc.onion_shop.links.txt".to_string(),
            "abc.onion_shop.png".to_string(),
        ]
    );

    let links = storage.get("abc.onion_shop.links.txt").await.unwrap().unwrap();
    let links = String::from_utf8(links).unwrap();
    assert_eq!(
        links,
        "[MARKET] http://abc[.]onion/market/vendor\n[?] http://other[.]onion/\n"
    );
}

#[tokio::test]
async fn test_screenshot_failure_does_not_flip_success() {
    let storage = InMemoryStorage::new();
    let fetcher = Arc::new(StubFetcher::new().page("http://abc.onion", 200, MARKET_PAGE));
    let discovery = Arc::new(StubDiscovery::available(fetcher));
    let shooter = Arc::new(StubScreenshotter::failing());
    let report = report_with(Arc::new(storage.clone()), RunLog::disabled());

    let ctx = context(discovery, report).with_screenshotter(shooter.clone());
    let summary = ScanOrchestrator::new(ctx)
        .run(vec!["abc.onion".to_string()], 1)
        .await;

    assert_eq!(shooter.calls(), 1);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 0);
    assert!(storage.get("abc.onion.png").await.unwrap().is_none());
    assert!(storage.get("abc.onion.html").await.unwrap().is_some());
}

#[tokio::test]
async fn test_screenshot_skipped_without_proxy() {
    let discovery = Arc::new(StubDiscovery::unavailable());
    let shooter = Arc::new(StubScreenshotter::succeeding());
    let report = report_with(Arc::new(InMemoryStorage::new()), RunLog::disabled());

    let ctx = context(discovery, report).with_screenshotter(shooter.clone());
    ScanOrchestrator::new(ctx)
        .run(vec!["abc.onion".to_string()], 2)
        .await;

    assert_eq!(shooter.calls(), 0);
}

#[tokio::test]
async fn test_persistence_failure_is_absorbed() {
    let fetcher = Arc::new(StubFetcher::new().page("http://abc.onion", 200, MARKET_PAGE));
    let discovery = Arc::new(StubDiscovery::available(fetcher));
    let report = report_with(Arc::new(FailingStorage), RunLog::disabled());

    let ctx = context(discovery, report).with_screenshotter(Arc::new(StubScreenshotter::succeeding()));
    let summary = ScanOrchestrator::new(ctx)
        .run(vec!["abc.onion".to_string()], 1)
        .await;

    assert_eq!(summary.success, 1);
    assert_eq!(summary.total_links, 2);
}

#[tokio::test]
async fn test_run_log_records_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("scan_result.log");
    let run_log = RunLog::open(&log_path).await.unwrap();

    let fetcher = Arc::new(StubFetcher::new().page("http://good.onion", 200, MARKET_PAGE));
    let discovery = Arc::new(StubDiscovery::available(fetcher));
    let report = report_with(Arc::new(InMemoryStorage::new()), run_log);

    let ctx = context(discovery, report.clone());
    ScanOrchestrator::new(ctx)
        .run(vec!["good.onion".to_string(), "bad.onion".to_string()], 2)
        .await;
    report.run_log().flush().await;

    let content = tokio::fs::read_to_string(&log_path).await.unwrap();
    assert!(content.contains("[SUCCESS] good.onion - 200 OK [MARKET]"));
    assert!(content.contains("[FAILED] bad.onion (access error)"));
    assert!(content.contains("[LINK]   -> [MARKET] http://good[.]onion/market/vendor"));
    assert!(!content.contains("http://other.onion"));
}

#[tokio::test]
async fn test_run_log_marks_proxy_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("scan_result.log");
    let run_log = RunLog::open(&log_path).await.unwrap();

    let report = report_with(Arc::new(InMemoryStorage::new()), run_log);
    let ctx = context(Arc::new(StubDiscovery::unavailable()), report.clone());
    ScanOrchestrator::new(ctx)
        .run(vec!["a.onion".to_string(), "b.onion".to_string()], 2)
        .await;
    report.run_log().flush().await;

    let content = tokio::fs::read_to_string(&log_path).await.unwrap();
    assert!(content.contains("[CRITICAL] No anonymizing proxy available"));
    assert!(content.contains("[FAILED] a.onion (proxy unavailable)"));
    assert!(content.contains("[FAILED] b.onion (proxy unavailable)"));
}

#[tokio::test]
async fn test_end_to_end_with_http_fixture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(MARKET_PAGE),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path());
    let client = FetchClient::direct(&HttpSettings::default()).unwrap();
    let discovery = Arc::new(StubDiscovery::available(Arc::new(client)));
    let report = report_with(Arc::new(storage), RunLog::disabled());

    let target = format!("{}/index", server.uri());
    let missing = format!("{}/missing", server.uri());
    let summary = ScanOrchestrator::new(context(discovery, report))
        .run(vec![target.clone(), missing], 2)
        .await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.results[0].status_code, Some(200));
    assert_eq!(summary.results[1].status_code, Some(404));
    assert_eq!(
        summary.results[0]
            .classification
            .as_ref()
            .map(|c| c.category_id.as_str()),
        Some("market")
    );

    let key = onionscan::utils::url_utils::artifact_key(&target);
    let html = tokio::fs::read_to_string(dir.path().join(format!("{}.html", key)))
        .await
        .unwrap();
    assert!(html.contains("Escrow Market"));
    let links = tokio::fs::read_to_string(dir.path().join(format!("{}.links.txt", key)))
        .await
        .unwrap();
    assert!(links.contains("/market/vendor"));
}
