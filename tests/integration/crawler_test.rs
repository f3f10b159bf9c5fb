// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use emailscope::config::settings::CrawlerSettings;
use emailscope::domain::services::crawl_service::CrawlService;
use emailscope::engines::reqwest_engine::ReqwestEngine;
use emailscope::utils::rate_gate::RateGate;
use emailscope::utils::retry_policy::RetryPolicy;
use emailscope::utils::robots::RobotsChecker;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler_settings() -> CrawlerSettings {
    CrawlerSettings {
        request_delay_ms: 0,
        rate_limit_interval_ms: 0,
        request_retries: 1,
        max_crawl_depth: 1,
        fetch_timeout_secs: 5,
        ..Default::default()
    }
}

fn build_crawler(settings: CrawlerSettings) -> CrawlService {
    let engine = ReqwestEngine::new(&settings).unwrap();
    let robots = RobotsChecker::new(
        engine.client().clone(),
        RetryPolicy::none(),
        settings.fetch_timeout(),
    );
    CrawlService::new(
        Arc::new(engine),
        Arc::new(robots),
        RateGate::unlimited(),
        settings,
    )
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_respects_robots_and_host() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/about">About</a>
           <a href="/private/staff">Staff</a>
           <a href="/brochure.pdf">Brochure</a>
           <a href="/feed">Feed</a>
           <a href="https://elsewhere.test/">Partner</a>
           <a href="mailto:info@example.com">Mail</a>"#,
    )
    .await;
    mount_page(&server, "/about", r#"<a href="/team">Team</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/staff"))
        .respond_with(html("secret"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/team"))
        .respond_with(html("too deep"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = build_crawler(crawler_settings());
    let urls = crawler.crawl(&server.uri(), &CancellationToken::new()).await;

    let base = server.uri();
    assert_eq!(urls, vec![format!("{}/", base), format!("{}/about", base)]);
}

#[tokio::test]
async fn test_crawl_bypassing_robots_visits_disallowed_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", r#"<a href="/contact">Contact</a>"#).await;
    mount_page(&server, "/contact", "Reach us at hello@example.com").await;

    let settings = CrawlerSettings {
        bypass_robots_policy: true,
        ..crawler_settings()
    };
    let crawler = build_crawler(settings);
    let urls = crawler.crawl(&server.uri(), &CancellationToken::new()).await;

    assert_eq!(urls.len(), 2);
}

#[tokio::test]
async fn test_crawl_caps_page_count() {
    let server = MockServer::start().await;

    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &links).await;
    for i in 0..10 {
        mount_page(&server, &format!("/p{}", i), "page").await;
    }

    let settings = CrawlerSettings {
        max_pages_per_domain: 4,
        ..crawler_settings()
    };
    let crawler = build_crawler(settings);
    let urls = crawler.crawl(&server.uri(), &CancellationToken::new()).await;

    assert_eq!(urls.len(), 4);
    assert_eq!(urls[0], format!("{}/", server.uri()));
}

#[tokio::test]
async fn test_cancelled_crawl_fetches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("home"))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let crawler = build_crawler(crawler_settings());

    assert!(crawler.crawl(&server.uri(), &cancel).await.is_empty());
}

#[tokio::test]
async fn test_fetch_content_returns_text_with_mailto_targets() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/contact",
        r#"<script>var x = "ignored@example.com";</script>
           <h1>Contact</h1>
           <p>Sales: <b>sales@example.com</b></p>
           <a href="mailto:press@example.com?subject=Hi">Press</a>"#,
    )
    .await;

    let crawler = build_crawler(crawler_settings());
    let text = crawler
        .fetch_content(&format!("{}/contact", server.uri()))
        .await
        .expect("page should be fetched");

    assert!(text.contains("sales@example.com"));
    assert!(text.contains("press@example.com"));
    assert!(!text.contains("ignored@example.com"));
    assert!(!text.contains("<b>"));
}

#[tokio::test]
async fn test_fetch_content_missing_page_is_none() {
    let server = MockServer::start().await;
    let crawler = build_crawler(crawler_settings());

    assert!(crawler
        .fetch_content(&format!("{}/missing", server.uri()))
        .await
        .is_none());
}

#[tokio::test]
async fn test_fetch_content_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", "recovered ops@example.com").await;

    let crawler = build_crawler(crawler_settings()).with_retry_policy(RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(10),
        enable_jitter: false,
        ..Default::default()
    });
    let text = crawler
        .fetch_content(&format!("{}/flaky", server.uri()))
        .await
        .expect("second attempt should succeed");

    assert!(text.contains("ops@example.com"));
}
