// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json, Path};
use std::sync::Arc;

use crate::{
    application::{
        dto::scrape_response::{CleanupResponseDto, EmailResultDto},
        use_cases::report_use_case::ReportUseCase,
    },
    domain::{
        models::report::ScrapeStats,
        repositories::scrape_repository::{DomainExport, DomainSummary, SessionSummary},
    },
    presentation::errors::AppError,
};

pub async fn get_results(
    Extension(use_case): Extension<Arc<ReportUseCase>>,
) -> Result<Json<Vec<EmailResultDto>>, AppError> {
    Ok(Json(use_case.results().await?))
}

pub async fn get_stats(
    Extension(use_case): Extension<Arc<ReportUseCase>>,
) -> Result<Json<ScrapeStats>, AppError> {
    Ok(Json(use_case.stats().await?))
}

pub async fn list_domains(
    Extension(use_case): Extension<Arc<ReportUseCase>>,
) -> Result<Json<Vec<DomainSummary>>, AppError> {
    Ok(Json(use_case.domains().await?))
}

/// 导出单个域名的邮箱、会话和日志
pub async fn export_domain(
    Extension(use_case): Extension<Arc<ReportUseCase>>,
    Path(domain): Path<String>,
) -> Result<Json<DomainExport>, AppError> {
    Ok(Json(use_case.export(&domain).await?))
}

pub async fn list_sessions(
    Extension(use_case): Extension<Arc<ReportUseCase>>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    Ok(Json(use_case.sessions().await?))
}

pub async fn clean_low_confidence(
    Extension(use_case): Extension<Arc<ReportUseCase>>,
) -> Result<Json<CleanupResponseDto>, AppError> {
    Ok(Json(use_case.clean_low_confidence().await?))
}
