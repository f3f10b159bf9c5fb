// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::{report_use_case::ReportUseCase, scrape_use_case::ScrapeUseCase};
use crate::presentation::handlers::{report_handler, scrape_handler};
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let api_routes = Router::new()
        .route("/api/scrape", post(scrape_handler::start_scrape))
        .route("/api/status", get(scrape_handler::get_status))
        .route("/api/logs", get(scrape_handler::get_logs))
        .route("/api/stop", post(scrape_handler::stop_scrape))
        .route("/api/clear", post(scrape_handler::clear_data))
        .route("/api/results", get(report_handler::get_results))
        .route("/api/stats", get(report_handler::get_stats))
        .route("/api/domains", get(report_handler::list_domains))
        .route("/api/domains/{domain}", get(report_handler::export_domain))
        .route("/api/sessions", get(report_handler::list_sessions))
        .route(
            "/api/clean-low-confidence",
            post(report_handler::clean_low_confidence),
        );

    Router::new().merge(public_routes).merge(api_routes)
}

/// 组装带共享状态和请求追踪的完整应用
pub fn app(scrape: Arc<ScrapeUseCase>, report: Arc<ReportUseCase>) -> Router {
    routes()
        .layer(Extension(scrape))
        .layer(Extension(report))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
