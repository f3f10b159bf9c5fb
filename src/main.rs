// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use emailscope::application::use_cases::report_use_case::ReportUseCase;
use emailscope::application::use_cases::scrape_use_case::ScrapeUseCase;
use emailscope::config::settings::Settings;
use emailscope::domain::repositories::scrape_repository::ScrapeRepository;
use emailscope::domain::services::crawl_service::CrawlService;
use emailscope::domain::services::extraction_service::ExtractionService;
use emailscope::domain::services::verification_service::{MxResolver, VerificationService};
use emailscope::engines::reqwest_engine::ReqwestEngine;
use emailscope::infrastructure::database::connection;
use emailscope::infrastructure::dns::HickoryMxResolver;
use emailscope::infrastructure::metrics;
use emailscope::infrastructure::repositories::memory_repo::MemoryScrapeRepository;
use emailscope::infrastructure::repositories::scrape_repo_impl::SeaOrmScrapeRepository;
use emailscope::presentation::routes;
use emailscope::utils::rate_gate::RateGate;
use emailscope::utils::retry_policy::RetryPolicy;
use emailscope::utils::robots::RobotsChecker;
use emailscope::utils::telemetry;
use emailscope::workers::ScrapePipeline;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging
    telemetry::init_telemetry(settings.server.json_logs);
    info!("Starting emailscope...");

    // Initialize Prometheus Metrics
    metrics::init_metrics(&settings.server.metrics_addr);

    // 3. Persistence
    let repository: Arc<dyn ScrapeRepository> = if settings.database.enabled {
        let db = connection::connect_and_migrate(&settings.database).await?;
        info!("Database connection established");
        Arc::new(SeaOrmScrapeRepository::new(Arc::new(db)))
    } else {
        warn!("Database disabled, results are kept in memory only");
        Arc::new(MemoryScrapeRepository::new())
    };

    // 4. Crawler (page and robots.txt requests share one gate)
    let gate = RateGate::new(settings.crawler.gate_interval());
    let engine = ReqwestEngine::new(&settings.crawler)?;
    let robots_checker = RobotsChecker::new(
        engine.client().clone(),
        RetryPolicy::from_settings(&settings.crawler),
        settings.crawler.fetch_timeout(),
    )
    .with_gate(gate.clone());
    let crawler = CrawlService::new(
        Arc::new(engine),
        Arc::new(robots_checker),
        gate,
        settings.crawler.clone(),
    );
    if settings.crawler.bypass_robots_policy {
        warn!("robots.txt checks are disabled");
    }

    // 5. Verifier
    let resolver: Option<Arc<dyn MxResolver>> = if settings.verifier.mock_dns_mode {
        info!("Mock DNS mode enabled, MX lookups are skipped");
        None
    } else {
        Some(Arc::new(HickoryMxResolver::new(
            settings.verifier.verification_timeout(),
        )))
    };
    let verifier = VerificationService::new(resolver, &settings.verifier, &settings.pipeline);

    // 6. Pipeline and use cases
    let pipeline = Arc::new(ScrapePipeline::new(
        Arc::new(crawler),
        Arc::new(ExtractionService::new(&settings.pipeline)),
        Arc::new(verifier),
        repository.clone(),
        &settings,
    ));
    let scrape_use_case = Arc::new(ScrapeUseCase::new(pipeline.clone(), repository.clone()));
    let report_use_case = Arc::new(ReportUseCase::new(repository));

    // 7. Start HTTP server
    let app = routes::app(scrape_use_case, report_use_case);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the active session before exiting
    if pipeline.request_stop() {
        info!("Stopping active scraping session...");
    }
    pipeline.join().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
