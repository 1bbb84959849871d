// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{classifier_config, generic_source, listing_page, test_app, Posting};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use jobrs::domain::models::scrape_run::RunSummary;
use jobrs::presentation::routes::{routes, AppState};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_and_version() {
    let app = test_app(Vec::new(), classifier_config());
    let router = routes(AppState {
        orchestrator: app.orchestrator,
    });

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::builder().uri("/v1/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_run_unknown_source_is_not_found() {
    let app = test_app(Vec::new(), classifier_config());
    let router = routes(AppState {
        orchestrator: app.orchestrator,
    });

    let response = router.oneshot(post("/v1/runs/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_trigger_run_returns_summary() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            listing_page(&[Posting::new("Buyer", "Negotiate with suppliers", "/jobs/1")]),
            "text/html",
        ))
        .mount(&server)
        .await;

    let app = test_app(
        vec![generic_source("acme", &format!("{}/jobs", server.uri()))],
        classifier_config(),
    );
    let router = routes(AppState {
        orchestrator: app.orchestrator,
    });

    let response = router.clone().oneshot(post("/v1/runs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let summary: RunSummary = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary.sources_total, 1);
    assert_eq!(summary.records_new, 1);

    let response = router.oneshot(post("/v1/runs/acme")).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let summary: RunSummary = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary.records_total, 1);
    assert_eq!(summary.records_new, 0);
}
