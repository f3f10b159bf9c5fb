// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::use_cases::scrape_use_case::ScrapeUseCaseError;
use crate::domain::repositories::scrape_repository::RepositoryError;
use crate::utils::errors::PipelineError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<ScrapeUseCaseError>() {
            return match err {
                ScrapeUseCaseError::Pipeline(e) => pipeline_status(e),
                ScrapeUseCaseError::Repository(e) => repository_status(e),
            };
        }
        if let Some(err) = self.0.downcast_ref::<PipelineError>() {
            return pipeline_status(err);
        }
        if let Some(err) = self.0.downcast_ref::<RepositoryError>() {
            return repository_status(err);
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidDomain
        | PipelineError::AlreadyRunning
        | PipelineError::NotRunning => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        }

        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
