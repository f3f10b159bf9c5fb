// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use crate::domain::models::session::SessionStatus;

/// 初始化指标系统
///
/// 地址为空时不启动导出器；地址被占用时只记录警告
pub fn init_metrics(addr: &str) {
    if addr.trim().is_empty() {
        info!("Metrics exporter disabled");
        return;
    }

    let addr: SocketAddr = match addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!("Invalid metrics address {}: {}", addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_counter!(
        "emailscope_sessions_total",
        "Total number of scraping sessions by terminal status"
    );
    describe_counter!(
        "emailscope_pages_processed_total",
        "Total number of pages processed for email extraction"
    );
    describe_counter!(
        "emailscope_fetch_failures_total",
        "Total number of pages dropped after failed fetches"
    );
    describe_counter!(
        "emailscope_emails_verified_total",
        "Total number of verified candidate emails"
    );
    describe_histogram!(
        "emailscope_session_duration_seconds",
        "Duration of scraping sessions in seconds"
    );

    info!("Metrics exporter listening on {}", addr);
}

/// 会话结束
pub fn record_session(status: SessionStatus, duration: Duration) {
    counter!("emailscope_sessions_total", "status" => status.to_string()).increment(1);
    histogram!("emailscope_session_duration_seconds").record(duration.as_secs_f64());
}

/// 页面处理完成
pub fn record_page(fetched: bool) {
    counter!("emailscope_pages_processed_total").increment(1);
    if !fetched {
        counter!("emailscope_fetch_failures_total").increment(1);
    }
}

/// 单个邮箱验证完成
pub fn record_verification(is_valid: bool) {
    counter!("emailscope_emails_verified_total", "valid" => is_valid.to_string()).increment(1);
}
