// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    classifier_config, generic_source, listing_page, test_app, test_app_with, FixedLoad, Posting,
    TestAppOptions,
};
use jobrs::domain::models::scrape_run::RunStatus;
use jobrs::domain::services::notification_service::NotificationReason;
use jobrs::domain::models::source_config::SourceConfig;
use jobrs::engines::error_classifier::{ErrorClassifierConfig, KindThresholds};
use jobrs::engines::fetcher::FetcherConfig;
use jobrs::workers::orchestrator::OrchestratorConfig;
use jobrs::workers::pipeline::PipelineConfig;
use jobrs::workers::orchestrator::OrchestratorError;
use jobrs::workers::scheduler::Scheduler;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn one_posting(title: &str, href: &str) -> String {
    listing_page(&[Posting::new(title, "Operate and maintain production lines", href)])
}

#[tokio::test]
async fn test_failing_source_does_not_affect_others() {
    let server = MockServer::start().await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(path("/healthy"))
        .respond_with(html(one_posting("Line Supervisor", "/healthy/1")))
        .mount(&server)
        .await;

    let app = test_app(
        vec![
            generic_source("broken", &format!("{}/broken", server.uri())),
            generic_source("healthy", &format!("{}/healthy", server.uri())),
        ],
        classifier_config(),
    );

    let summary = app.orchestrator.run_all().await.unwrap();

    assert_eq!(summary.sources_total, 2);
    assert_eq!(summary.sources_failed, 1);
    assert_eq!(summary.sources_succeeded, 1);
    assert_eq!(summary.records_new, 1);

    let broken = summary.runs.iter().find(|run| run.source_id == "broken").unwrap();
    assert_eq!(broken.status, RunStatus::Failed);
    assert!(broken.error_summary.as_deref().unwrap().contains("503"));

    let sent = app.notifier.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].source_id, "broken");
    assert_eq!(sent[0].run_id, broken.id);
    assert_eq!(sent[0].reason, NotificationReason::RunFailed);

    assert_eq!(app.sink.len(), 1);
    assert_eq!(app.sink.jobs()[0].record.source_id, "healthy");
}

#[tokio::test]
async fn test_failure_threshold_halts_source_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = ErrorClassifierConfig {
        thresholds: KindThresholds {
            connection: 2,
            ..KindThresholds::default()
        },
        ..classifier_config()
    };
    let app = test_app(
        vec![generic_source("acme", &format!("{}/jobs", server.uri()))],
        config,
    );

    let summary = app.orchestrator.run_all().await.unwrap();
    assert_eq!(summary.sources_failed, 1);

    let sent = app.notifier.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reason, NotificationReason::FailureThreshold);

    // The circuit stays open, so the second run never reaches the server.
    let again = app.orchestrator.run_one("acme").await.unwrap();
    assert_eq!(again.runs[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_pagination_stops_at_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("page", "1"))
        .respond_with(html(one_posting("Welder", "/jobs/1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("page", "2"))
        .respond_with(html("<html><body><main></main></body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("page", "3"))
        .respond_with(html(one_posting("Painter", "/jobs/3")))
        .expect(0)
        .mount(&server)
        .await;

    let mut source = generic_source("acme", &format!("{}/jobs", server.uri()));
    source.pagination.max_pages = 5;
    let app = test_app(vec![source], classifier_config());

    let summary = app.orchestrator.run_all().await.unwrap();
    assert_eq!(summary.records_total, 1);
    assert_eq!(summary.runs[0].status, RunStatus::Success);
}

#[tokio::test]
async fn test_later_page_failure_keeps_earlier_records() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .and(query_param("page", "1"))
        .respond_with(html(one_posting("Welder", "/jobs/1")))
        .mount(&server)
        .await;
    Mock::given(path("/jobs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut source = generic_source("acme", &format!("{}/jobs", server.uri()));
    source.pagination.max_pages = 3;
    let app = test_app(vec![source], classifier_config());

    let summary = app.orchestrator.run_all().await.unwrap();
    let run = &summary.runs[0];
    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(run.new, 1);
    assert_eq!(run.errors, 1);
    assert!(app.notifier.sent.lock().is_empty());
}

#[tokio::test]
async fn test_disabled_sources_are_skipped_but_runnable_directly() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .respond_with(html(one_posting("Cashier", "/jobs/1")))
        .mount(&server)
        .await;

    let mut source = generic_source("paused", &format!("{}/jobs", server.uri()));
    source.enabled = false;
    let app = test_app(vec![source], classifier_config());

    let all = app.orchestrator.run_all().await.unwrap();
    assert_eq!(all.sources_total, 0);

    let one = app.orchestrator.run_one("paused").await.unwrap();
    assert_eq!(one.sources_total, 1);
    assert_eq!(one.records_new, 1);
}

#[tokio::test]
async fn test_run_one_unknown_source() {
    let app = test_app(Vec::new(), classifier_config());
    let err = app.orchestrator.run_one("missing").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::SourceNotFound(id) if id == "missing"));
}

#[tokio::test]
async fn test_scheduler_skips_tick_while_run_in_progress() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .respond_with(html(one_posting("Cashier", "/jobs/1")).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let app = test_app(
        vec![generic_source("slow", &format!("{}/jobs", server.uri()))],
        classifier_config(),
    );
    let scheduler = Scheduler::new(app.orchestrator.clone(), Duration::from_secs(3600));

    let (summary, skipped_tick) = tokio::join!(app.orchestrator.run_all(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.tick().await
    });

    assert_eq!(summary.unwrap().records_new, 1);
    assert!(!skipped_tick);
    assert!(scheduler.tick().await);
}

fn lever_source(id: &str, base_url: &str, max_pages: u32) -> SourceConfig {
    serde_yaml::from_str(&format!(
        "{{ id: {}, base_url: '{}', platform: lever, pagination: {{ max_pages: {} }} }}",
        id, base_url, max_pages
    ))
    .unwrap()
}

#[tokio::test]
async fn test_unparseable_pages_trip_parsing_threshold() {
    let server = MockServer::start().await;
    Mock::given(path("/v0/postings/acme"))
        .respond_with(html("<html>blocked</html>".to_string()))
        .expect(3)
        .mount(&server)
        .await;

    let app = test_app(
        vec![lever_source(
            "lever-acme",
            &format!("{}/v0/postings/acme", server.uri()),
            6,
        )],
        classifier_config(),
    );

    let summary = app.orchestrator.run_all().await.unwrap();
    let run = &summary.runs[0];
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.errors, 3);

    let sent = app.notifier.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reason, NotificationReason::FailureThreshold);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_slow_source_hits_hard_timeout() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(html(one_posting("Forklift Operator", "/slow/1")).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    Mock::given(path("/healthy"))
        .respond_with(html(one_posting("Line Supervisor", "/healthy/1")))
        .mount(&server)
        .await;

    let app = test_app_with(
        vec![
            generic_source("slow", &format!("{}/slow", server.uri())),
            generic_source("healthy", &format!("{}/healthy", server.uri())),
        ],
        TestAppOptions {
            orchestrator: OrchestratorConfig {
                max_concurrent_sources: 2,
                source_timeout_secs: 1,
            },
            ..TestAppOptions::default()
        },
    );

    let started = Instant::now();
    let summary = app.orchestrator.run_all().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));

    let slow = summary.runs.iter().find(|run| run.source_id == "slow").unwrap();
    assert_eq!(slow.status, RunStatus::Failed);
    assert!(slow.error_summary.as_deref().unwrap().contains("timed out"));

    let healthy = summary.runs.iter().find(|run| run.source_id == "healthy").unwrap();
    assert_eq!(healthy.status, RunStatus::Success);
    assert_eq!(healthy.new, 1);

    let sent = app.notifier.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].source_id, "slow");
    assert_eq!(sent[0].reason, NotificationReason::RunFailed);
    assert!(sent[0].summary.contains("timed out"));
}

#[tokio::test]
async fn test_high_error_ratio_shrinks_batches_to_minimum() {
    let server = MockServer::start().await;
    let postings: Vec<Posting> = (0..8)
        .map(|_| Posting {
            title: "Warehouse Associate",
            description: Some("Pick and pack orders"),
            location: Some("Monterrey, NL"),
            href: None,
        })
        .collect();
    Mock::given(path("/jobs"))
        .respond_with(html(listing_page(&postings)))
        .mount(&server)
        .await;

    let load = Arc::new(FixedLoad::new(0.10, 0.10));
    let app = test_app_with(
        vec![generic_source("acme", &format!("{}/jobs", server.uri()))],
        TestAppOptions {
            pipeline: PipelineConfig {
                batch_size: 4,
                min_batch_size: 1,
                batch_reduction_factor: 0.5,
                delay_increment_ms: 0,
                ..PipelineConfig::default()
            },
            sampler: load.clone(),
            ..TestAppOptions::default()
        },
    );

    let summary = app.orchestrator.run_all().await.unwrap();
    assert_eq!(summary.runs[0].errors, 8);
    // Batches of 4, 2, 1 and 1: one health check after each.
    assert_eq!(load.calls(), 4);
}

#[tokio::test]
async fn test_high_cpu_grows_delay_up_to_ceiling() {
    let server = MockServer::start().await;
    let page = listing_page(&[
        Posting::new("Welder", "Weld structural steel frames", "/jobs/1"),
        Posting::new("Painter", "Paint finished assemblies", "/jobs/2"),
        Posting::new("Fitter", "Fit pipework to drawings", "/jobs/3"),
        Posting::new("Rigger", "Rig loads for overhead cranes", "/jobs/4"),
    ]);
    Mock::given(path("/jobs"))
        .respond_with(html(page))
        .mount(&server)
        .await;

    let load = Arc::new(FixedLoad::new(0.10, 0.99));
    let app = test_app_with(
        vec![generic_source("acme", &format!("{}/jobs", server.uri()))],
        TestAppOptions {
            pipeline: PipelineConfig {
                batch_size: 1,
                min_batch_size: 1,
                base_delay_ms: 0,
                delay_increment_ms: 200,
                max_delay_ms: 250,
                ..PipelineConfig::default()
            },
            sampler: load.clone(),
            ..TestAppOptions::default()
        },
    );

    let started = Instant::now();
    let summary = app.orchestrator.run_all().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.records_new, 4);
    assert_eq!(load.calls(), 4);
    // 200ms, then capped at 250ms for the remaining three batches.
    assert!(elapsed >= Duration::from_millis(950), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2_000), "{elapsed:?}");
}

#[tokio::test]
async fn test_memory_pressure_purges_expired_cache_entries() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .respond_with(html(one_posting("Cashier", "/jobs/1")))
        .mount(&server)
        .await;

    let options = |load: Arc<FixedLoad>| TestAppOptions {
        fetcher: FetcherConfig {
            max_retries: 1,
            request_timeout_secs: 5,
            cache_ttl_secs: 0,
            ..FetcherConfig::default()
        },
        sampler: load,
        ..TestAppOptions::default()
    };
    let source = generic_source("acme", &format!("{}/jobs", server.uri()));

    let relaxed = test_app_with(vec![source.clone()], options(Arc::new(FixedLoad::new(0.10, 0.10))));
    relaxed.orchestrator.run_all().await.unwrap();
    assert_eq!(relaxed.fetcher.resources().cache.len(), 1);

    let pressured = test_app_with(vec![source], options(Arc::new(FixedLoad::new(0.95, 0.10))));
    let summary = pressured.orchestrator.run_all().await.unwrap();
    assert_eq!(summary.records_new, 1);
    assert_eq!(pressured.fetcher.resources().cache.len(), 0);
}
