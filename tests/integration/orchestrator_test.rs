// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{context, report_with, Behavior, StubDiscovery, StubFetcher, MARKET_PAGE};
use onionscan::domain::models::scan_result::FailureKind;
use onionscan::infrastructure::report::RunLog;
use onionscan::infrastructure::storage::InMemoryStorage;
use onionscan::workers::ScanOrchestrator;
use std::sync::Arc;

fn targets(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("site{}.onion", i)).collect()
}

fn orchestrator(discovery: Arc<StubDiscovery>) -> ScanOrchestrator {
    let report = report_with(Arc::new(InMemoryStorage::new()), RunLog::disabled());
    ScanOrchestrator::new(context(discovery, report))
}

#[tokio::test]
async fn test_proxy_unavailable_fails_every_target_for_any_worker_count() {
    for workers in [1, 3, 10] {
        let discovery = Arc::new(StubDiscovery::unavailable());
        let summary = orchestrator(discovery.clone())
            .run(targets(7), workers)
            .await;

        assert_eq!(discovery.calls(), 1, "discovery runs once per batch");
        assert_eq!(summary.total, 7);
        assert_eq!(summary.success, 0);
        assert_eq!(summary.failure, 7);
        assert_eq!(summary.results.len(), 7);
        assert!(summary.results.iter().all(|r| r.is_proxy_unavailable()));
        assert!(summary.results.iter().all(|r| r.profile.is_none()));
    }
}

#[tokio::test]
async fn test_every_target_gets_exactly_one_result_in_submission_order() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("http://site0.onion", 200, MARKET_PAGE)
            .page("http://site2.onion", 200, "<html><body>empty</body></html>")
            .with("http://site3.onion", Behavior::Fail("timed out".to_string()))
            .page("http://site4.onion", 200, MARKET_PAGE),
    );
    let discovery = Arc::new(StubDiscovery::available(fetcher.clone()));
    let input = targets(6);

    let summary = orchestrator(discovery).run(input.clone(), 3).await;

    assert_eq!(summary.total, 6);
    assert_eq!(summary.success + summary.failure, summary.total);
    assert_eq!(summary.success, 3);
    assert_eq!(summary.failure, 3);
    assert_eq!(summary.total_links, 4);
    assert_eq!(fetcher.calls(), 6, "each target is attempted exactly once");

    let order: Vec<&str> = summary.results.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(order, input.iter().map(String::as_str).collect::<Vec<_>>());

    let first = &summary.results[0];
    assert!(first.success);
    assert_eq!(first.link_count, 2);
    assert_eq!(
        first.classification.as_ref().map(|c| c.category_id.as_str()),
        Some("market")
    );

    let second = &summary.results[1];
    assert!(!second.success);
    assert_eq!(second.failure.as_ref().map(|f| f.kind), Some(FailureKind::Fetch));
}

#[tokio::test]
async fn test_non_success_status_counts_as_success() {
    let fetcher = Arc::new(StubFetcher::new().page("http://site0.onion", 404, "<p>gone</p>"));
    let discovery = Arc::new(StubDiscovery::available(fetcher));

    let summary = orchestrator(discovery).run(targets(1), 2).await;

    assert_eq!(summary.success, 1);
    assert_eq!(summary.results[0].status_code, Some(404));
    assert!(summary.results[0]
        .classification
        .as_ref()
        .is_some_and(|c| c.is_unknown));
}

#[tokio::test]
async fn test_body_read_failure_is_reported_separately() {
    let fetcher = Arc::new(StubFetcher::new().with("http://site0.onion", Behavior::BodyFail));
    let discovery = Arc::new(StubDiscovery::available(fetcher));

    let summary = orchestrator(discovery).run(targets(1), 1).await;

    assert_eq!(summary.failure, 1);
    let result = &summary.results[0];
    assert_eq!(result.failure.as_ref().map(|f| f.kind), Some(FailureKind::Body));
    assert!(result.profile.is_some());
}

#[tokio::test]
async fn test_lost_worker_is_synthesized_as_failure() {
    let fetcher = Arc::new(
        StubFetcher::new()
            .page("http://site0.onion", 200, MARKET_PAGE)
            .with("http://site1.onion", Behavior::Panic)
            .page("http://site2.onion", 200, MARKET_PAGE),
    );
    let discovery = Arc::new(StubDiscovery::available(fetcher));

    let summary = orchestrator(discovery).run(targets(3), 2).await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.success + summary.failure, 3);
    assert_eq!(summary.results[1].target, "site1.onion");
    assert_eq!(
        summary.results[1].failure.as_ref().map(|f| f.kind),
        Some(FailureKind::WorkerLost)
    );
    assert!(summary.results[0].success);
    assert!(summary.results[2].success);
}

#[tokio::test]
async fn test_zero_workers_still_completes_batch() {
    let fetcher = Arc::new(StubFetcher::new().page("http://site0.onion", 200, MARKET_PAGE));
    let discovery = Arc::new(StubDiscovery::available(fetcher));

    let summary = orchestrator(discovery).run(targets(2), 0).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.success + summary.failure, 2);
}

#[tokio::test]
async fn test_empty_batch() {
    let discovery = Arc::new(StubDiscovery::unavailable());
    let summary = orchestrator(discovery).run(Vec::new(), 4).await;

    assert_eq!(summary.total, 0);
    assert_eq!(summary.success, 0);
    assert_eq!(summary.failure, 0);
    assert!(summary.results.is_empty());
}

#[tokio::test]
async fn test_seeded_profile_selection_is_reproducible() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let fetcher = Arc::new(StubFetcher::new());
        let discovery = Arc::new(StubDiscovery::available(fetcher.clone()));
        orchestrator(discovery).run(targets(8), 1).await;
        runs.push(fetcher.profiles_seen());
    }

    assert_eq!(runs[0].len(), 8);
    assert_eq!(runs[0], runs[1]);
}
