// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{classifier_config, generic_source, listing_page, test_app, Posting};
use jobrs::domain::models::scrape_run::RunStatus;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_listing_is_normalized_classified_and_persisted() {
    let server = MockServer::start().await;
    let listing = listing_page(&[
        Posting::new(
            "Senior Python Developer",
            "5+ years with Python and AWS. $60,000 - $80,000",
            "/jobs/a",
        ),
        Posting {
            description: None,
            ..Posting::new("Logistics Coordinator", "", "/jobs/b")
        },
        Posting {
            href: None,
            ..Posting::new("Warehouse Operator", "Forklift experience", "")
        },
        Posting {
            location: None,
            ..Posting::new("Data Analyst", "SQL and Power BI dashboards", "/jobs/d")
        },
    ]);
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(html(listing))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/d"))
        .respond_with(html(
            "<html><body><span class=\"location\">Guadalajara, JAL</span></body></html>"
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let source = generic_source("acme", &format!("{}/jobs", server.uri()));
    let app = test_app(vec![source], classifier_config());

    let summary = app.orchestrator.run_all().await.unwrap();

    assert_eq!(summary.sources_total, 1);
    assert_eq!(summary.sources_succeeded, 1);
    assert_eq!(summary.records_total, 4);
    assert_eq!(summary.records_new, 3);

    let run = &summary.runs[0];
    assert_eq!(run.found, 4);
    assert_eq!(run.new, 3);
    assert_eq!(run.errors, 1);
    assert_eq!(run.status, RunStatus::Partial);

    let jobs = app.sink.jobs();
    assert_eq!(jobs.len(), 3);
    assert!(jobs.iter().all(|job| job.run_id == run.id));
    assert!(jobs.iter().all(|job| job.business_unit == job.record.business_unit));

    let find = |title: &str| {
        jobs.iter()
            .find(|job| job.record.title == title)
            .unwrap_or_else(|| panic!("{} was not persisted", title))
    };
    let developer = find("Senior Python Developer");
    assert_eq!(developer.business_unit, "tech_talent");
    assert_eq!(developer.record.url, format!("{}/jobs/a", server.uri()));
    assert_eq!(developer.record.analysis.experience_years, Some(5));

    let coordinator = find("Logistics Coordinator");
    assert!(coordinator.record.description.starts_with("Coordinate inbound"));

    let analyst = find("Data Analyst");
    assert_eq!(analyst.record.location, "Guadalajara, JAL");
    assert_eq!(analyst.record.description, "SQL and Power BI dashboards");

    assert!(jobs.iter().all(|job| job.record.title != "Warehouse Operator"));
}

#[tokio::test]
async fn test_rerun_reports_no_new_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(html(listing_page(&[
            Posting::new("Buyer", "Negotiate with suppliers", "/jobs/1"),
            Posting::new("Planner", "Plan production schedules", "/jobs/2"),
        ])))
        .mount(&server)
        .await;

    let source = generic_source("acme", &format!("{}/jobs", server.uri()));
    let app = test_app(vec![source], classifier_config());

    let first = app.orchestrator.run_all().await.unwrap();
    let second = app.orchestrator.run_all().await.unwrap();

    assert_eq!(first.records_new, 2);
    assert_eq!(second.records_total, 2);
    assert_eq!(second.records_new, 0);
    assert_eq!(second.runs[0].status, RunStatus::Success);
    assert_eq!(app.sink.len(), 2);
}
