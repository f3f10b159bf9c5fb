// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use axum_test::TestServer;
use emailscope::application::use_cases::report_use_case::ReportUseCase;
use emailscope::application::use_cases::scrape_use_case::ScrapeUseCase;
use emailscope::config::settings::{CrawlerSettings, DatabaseSettings, Settings, VerifierSettings};
use emailscope::domain::repositories::scrape_repository::ScrapeRepository;
use emailscope::domain::services::crawl_service::CrawlService;
use emailscope::domain::services::extraction_service::ExtractionService;
use emailscope::domain::services::verification_service::VerificationService;
use emailscope::engines::traits::{EngineError, FetchRequest, FetchResponse, PageFetcher};
use emailscope::infrastructure::database::connection;
use emailscope::infrastructure::repositories::scrape_repo_impl::SeaOrmScrapeRepository;
use emailscope::presentation::routes;
use emailscope::utils::rate_gate::RateGate;
use emailscope::utils::robots::RobotsCheckerTrait;
use emailscope::workers::ScrapePipeline;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub pipeline: Arc<ScrapePipeline>,
    pub repository: Arc<dyn ScrapeRepository>,
}

/// 放行所有地址的 robots 检查器
pub struct AllowAll;

#[async_trait]
impl RobotsCheckerTrait for AllowAll {
    async fn is_allowed(&self, _url_str: &str, _user_agent: &str) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn get_crawl_delay(
        &self,
        _url_str: &str,
        _user_agent: &str,
    ) -> anyhow::Result<Option<Duration>> {
        Ok(None)
    }
}

/// 固定内容的站点
#[derive(Default)]
pub struct FixtureSite {
    pages: HashMap<String, String>,
    delay: Duration,
}

impl FixtureSite {
    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PageFetcher for FixtureSite {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let content = self
            .pages
            .get(&request.url)
            .ok_or(EngineError::HttpStatus(404))?;
        Ok(FetchResponse {
            status_code: 200,
            content: content.clone(),
            content_type: "text/html; charset=utf-8".to_string(),
            final_url: request.url.clone(),
            response_time_ms: 1,
        })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.crawler = CrawlerSettings {
        request_delay_ms: 0,
        rate_limit_interval_ms: 0,
        request_retries: 1,
        max_crawl_depth: 1,
        ..Default::default()
    };
    settings.verifier = VerifierSettings {
        mock_dns_mode: true,
        ..Default::default()
    };
    settings.database = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        min_connections: Some(1),
        ..Default::default()
    };
    settings.pipeline.cooldown_secs = 60;
    settings
}

pub fn example_site() -> FixtureSite {
    FixtureSite::default()
        .page(
            "https://example.com/",
            r#"<html><body>
                <p>Write to jane.doe@example.com</p>
                <a href="/contact">Contact</a>
            </body></html>"#,
        )
        .page(
            "https://example.com/contact",
            r#"<html><body><a href="mailto:info@example.com">Email us</a></body></html>"#,
        )
}

pub async fn create_test_app(site: FixtureSite) -> TestApp {
    create_test_app_with_settings(site, test_settings()).await
}

pub async fn create_test_app_with_settings(site: FixtureSite, settings: Settings) -> TestApp {
    let db = connection::connect_and_migrate(&settings.database)
        .await
        .expect("Failed to set up in-memory database");
    let repository: Arc<dyn ScrapeRepository> = Arc::new(SeaOrmScrapeRepository::new(Arc::new(db)));

    let crawler = CrawlService::new(
        Arc::new(site),
        Arc::new(AllowAll),
        RateGate::unlimited(),
        settings.crawler.clone(),
    );
    let verifier = VerificationService::new(None, &settings.verifier, &settings.pipeline);
    let pipeline = Arc::new(ScrapePipeline::new(
        Arc::new(crawler),
        Arc::new(ExtractionService::new(&settings.pipeline)),
        Arc::new(verifier),
        repository.clone(),
        &settings,
    ));

    let scrape = Arc::new(ScrapeUseCase::new(pipeline.clone(), repository.clone()));
    let report = Arc::new(ReportUseCase::new(repository.clone()));
    let server = TestServer::new(routes::app(scrape, report)).expect("Failed to start test server");

    TestApp {
        server,
        pipeline,
        repository,
    }
}
