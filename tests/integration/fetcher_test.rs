// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{classifier_config, generic_source, test_fetcher};
use jobrs::domain::models::source_config::HttpMethod;
use jobrs::engines::fetcher::{DetailFetcher, FetchRequest};
use jobrs::engines::traits::EngineError;
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_repeated_fetch_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>jobs</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(classifier_config());
    let source = generic_source("acme", &format!("{}/jobs", server.uri()));
    let request = FetchRequest::listing(&source, source.base_url.clone(), None);

    let first = fetcher.fetch(&request).await.unwrap();
    let second = fetcher.fetch(&request).await.unwrap();
    assert_eq!(first, "<html>jobs</html>");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&server)
        .await;

    let fetcher = test_fetcher(classifier_config());
    let source = generic_source("acme", &format!("{}/jobs", server.uri()));
    let content = fetcher
        .fetch(&FetchRequest::listing(&source, source.base_url.clone(), None))
        .await
        .unwrap();

    assert_eq!(content, "recovered");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert!(!fetcher.resources().classifier.is_open("acme"));
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(classifier_config());
    let source = generic_source("acme", &format!("{}/jobs", server.uri()));
    let err = fetcher
        .fetch(&FetchRequest::listing(&source, source.base_url.clone(), None))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::HttpStatus { status: 404 }));
}

#[tokio::test]
async fn test_post_sources_send_json_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(body_json(json!({"limit": 20, "offset": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobPostings": []})))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = test_fetcher(classifier_config());
    let mut source = generic_source("acme", &format!("{}/api/search", server.uri()));
    source.method = HttpMethod::Post;
    let request = FetchRequest::listing(
        &source,
        source.base_url.clone(),
        Some(json!({"limit": 20, "offset": 0})),
    );

    let content = fetcher.fetch(&request).await.unwrap();
    assert!(content.contains("jobPostings"));
}

#[tokio::test]
async fn test_detail_page_fields_are_extracted() {
    let server = MockServer::start().await;
    Mock::given(path("/jobs/7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><h1>Forklift Operator</h1><p>Night shift</p>\
             <span class=\"location\">Querétaro</span></body></html>",
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;

    let fetcher = test_fetcher(classifier_config());
    let source = generic_source("acme", &format!("{}/jobs", server.uri()));
    let url = format!("{}/jobs/7", server.uri());

    let record = fetcher.fetch_detail(&source, &url).await.unwrap();
    assert_eq!(record.title.as_deref(), Some("Forklift Operator"));
    assert_eq!(record.description.as_deref(), Some("Night shift"));
    assert_eq!(record.location.as_deref(), Some("Querétaro"));
    assert_eq!(record.url.as_deref(), Some(url.as_str()));
}
