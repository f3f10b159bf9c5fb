// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::repositories::scrape_repository::RepositoryError;
use crate::domain::services::verification_service::ResolutionError;
use crate::engines::traits::EngineError;

/// 流水线错误类型
///
/// 单个任务内的失败（抓取、解析、持久化）在任务内部消化；
/// 只有阶段级的空结果或编排层自身的失败会终止会话。
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    FetchFailure(#[from] EngineError),

    #[error("MX resolution failed: {0}")]
    ResolutionFailure(#[from] ResolutionError),

    #[error("No URLs found for {0}")]
    NoUrlsDiscovered(String),

    #[error("No emails found for {0}")]
    NoCandidatesFound(String),

    #[error("Scraping stopped by user")]
    UserCancelled,

    #[error("persistence failed: {0}")]
    PersistenceFailure(#[from] RepositoryError),

    #[error("unexpected failure: {0}")]
    UnexpectedFailure(String),

    #[error("Scraping already in progress")]
    AlreadyRunning,

    #[error("No scraping in progress")]
    NotRunning,

    #[error("Domain is required")]
    InvalidDomain,
}

impl PipelineError {
    /// 错误对应的会话终态是否为 stopped（否则为 error）
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::UserCancelled)
    }
}
