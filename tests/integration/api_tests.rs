// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, example_site, FixtureSite};
use emailscope::domain::models::email::EmailSource;
use emailscope::domain::repositories::scrape_repository::NewEmail;
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(FixtureSite::default()).await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_scrape_rejects_empty_domain() {
    let app = create_test_app(FixtureSite::default()).await;

    let response = app
        .server
        .post("/api/scrape")
        .json(&json!({ "domain": "   " }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "Domain is required");
}

#[tokio::test]
async fn test_full_scrape_flow() {
    let app = create_test_app(example_site()).await;

    let response = app
        .server
        .post("/api/scrape")
        .json(&json!({ "domain": "https://Example.com/" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "started");
    assert_eq!(body["message"], "Started scraping example.com");

    app.pipeline.join().await;

    let status: Value = app.server.get("/api/status").await.json();
    assert_eq!(status["status"], "completed");
    // 8 role addresses plus jane.doe; info@ is both found and generated
    assert_eq!(status["results_count"], 9);

    let results: Vec<Value> = app.server.get("/api/results").await.json();
    assert_eq!(results.len(), 9);
    let jane = results
        .iter()
        .find(|r| r["email"] == "jane.doe@example.com")
        .expect("found address missing");
    assert_eq!(jane["source"], "found");
    assert_eq!(jane["status"], "verified");
    let info = results
        .iter()
        .find(|r| r["email"] == "info@example.com")
        .expect("role address missing");
    assert_eq!(info["source"], "found");

    let stats: Value = app.server.get("/api/stats").await.json();
    assert_eq!(stats["total_domains"], 1);
    assert_eq!(stats["total_emails"], 9);
    assert_eq!(stats["verified_emails"], 9);
    assert_eq!(stats["verification_rate"], 100.0);

    let logs: Vec<Value> = app.server.get("/api/logs").await.json();
    assert_eq!(logs[0]["message"], "Starting scraping for example.com");
    assert_eq!(logs[0]["timestamp"].as_str().map(str::len), Some(8));
    assert!(logs
        .iter()
        .any(|l| l["message"] == "[SUCCESS] Found 2 URLs to process"));
    assert_eq!(
        logs.last().map(|l| l["message"].clone()),
        Some(json!("[COMPLETE] Scraping completed! Found 9 emails."))
    );

    let domains: Vec<Value> = app.server.get("/api/domains").await.json();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0]["domain"], "example.com");
    assert_eq!(domains[0]["status"], "completed");
    assert_eq!(domains[0]["total_emails"], 9);

    let sessions: Vec<Value> = app.server.get("/api/sessions").await.json();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["status"], "completed");
    assert_eq!(sessions[0]["total_emails_found"], 9);
    assert!(!sessions[0]["completed_at"].is_null());

    let export: Value = app.server.get("/api/domains/example.com").await.json();
    assert_eq!(export["domain"]["domain"], "example.com");
    assert_eq!(export["emails"].as_array().map(Vec::len), Some(9));
    assert!(!export["logs"].as_array().map(Vec::is_empty).unwrap_or(true));
}

#[tokio::test]
async fn test_second_scrape_rejected_while_running() {
    let app = create_test_app(example_site().slow(Duration::from_millis(200))).await;

    app.server
        .post("/api/scrape")
        .json(&json!({ "domain": "example.com" }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/scrape")
        .json(&json!({ "domain": "other.com" }))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "Scraping already in progress");

    let status: Value = app.server.get("/api/status").await.json();
    assert_eq!(status["status"], "scraping");

    app.pipeline.request_stop();
    app.pipeline.join().await;
}

#[tokio::test]
async fn test_stop_scrape() {
    let app = create_test_app(example_site().slow(Duration::from_millis(200))).await;

    let response = app.server.post("/api/stop").await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "No scraping in progress");

    app.server
        .post("/api/scrape")
        .json(&json!({ "domain": "example.com" }))
        .await
        .assert_status_ok();

    let response = app.server.post("/api/stop").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Stop requested");

    app.pipeline.join().await;

    let status: Value = app.server.get("/api/status").await.json();
    assert_eq!(status["status"], "stopped");

    let logs: Vec<Value> = app.server.get("/api/logs").await.json();
    assert!(logs
        .iter()
        .any(|l| l["message"] == "[STOP] Scraping stopped by user"));

    let sessions: Vec<Value> = app.server.get("/api/sessions").await.json();
    assert_eq!(sessions[0]["status"], "stopped");
}

#[tokio::test]
async fn test_export_unknown_domain_returns_404() {
    let app = create_test_app(FixtureSite::default()).await;

    let response = app.server.get("/api/domains/unknown.com").await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_clean_low_confidence() {
    let app = create_test_app(example_site()).await;

    app.server
        .post("/api/scrape")
        .json(&json!({ "domain": "example.com" }))
        .await
        .assert_status_ok();
    app.pipeline.join().await;

    let domain_id = app.repository.all_domains().await.unwrap()[0].id;
    app.repository
        .add_email(
            domain_id,
            NewEmail {
                email: "x12345@example.com".to_string(),
                confidence: 10,
                is_valid: false,
                reason: "Low confidence".to_string(),
                source: EmailSource::Generated,
            },
        )
        .await
        .unwrap();

    let response = app.server.post("/api/clean-low-confidence").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["removed_count"], 1);
    assert_eq!(body["message"], "Removed 1 low-confidence emails");

    let results: Vec<Value> = app.server.get("/api/results").await.json();
    assert_eq!(results.len(), 9);
}

#[tokio::test]
async fn test_clear_data() {
    let app = create_test_app(example_site()).await;

    app.server
        .post("/api/scrape")
        .json(&json!({ "domain": "example.com" }))
        .await
        .assert_status_ok();
    app.pipeline.join().await;

    let response = app.server.post("/api/clear").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "All data cleared");

    let stats: Value = app.server.get("/api/stats").await.json();
    assert_eq!(stats["total_domains"], 0);
    assert_eq!(stats["total_emails"], 0);
    assert_eq!(stats["verification_rate"], 0.0);

    let logs: Vec<Value> = app.server.get("/api/logs").await.json();
    assert!(logs.is_empty());
    let status: Value = app.server.get("/api/status").await.json();
    assert_eq!(status["results_count"], 0);
}
