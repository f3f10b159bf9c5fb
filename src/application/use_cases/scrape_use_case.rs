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

use crate::{
    application::dto::{
        scrape_request::ScrapeRequestDto,
        scrape_response::{LogLineDto, MessageResponseDto, ScrapeStartedDto, StatusResponseDto},
    },
    domain::repositories::scrape_repository::{RepositoryError, ScrapeRepository},
    utils::errors::PipelineError,
    workers::pipeline::ScrapePipeline,
};
use std::sync::Arc;
use thiserror::Error;

/// 实时日志为空时回放的历史日志条数
pub const HISTORY_LOG_LIMIT: u64 = 50;

#[derive(Error, Debug)]
pub enum ScrapeUseCaseError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

// === Section: Use Case Definition ===

/// 抓取控制用例
///
/// 提交、停止、查询当前会话，以及清空数据
pub struct ScrapeUseCase {
    pipeline: Arc<ScrapePipeline>,
    repository: Arc<dyn ScrapeRepository>,
}

// === Section: Implementation ===

impl ScrapeUseCase {
    pub fn new(pipeline: Arc<ScrapePipeline>, repository: Arc<dyn ScrapeRepository>) -> Self {
        Self {
            pipeline,
            repository,
        }
    }

    pub fn pipeline(&self) -> &Arc<ScrapePipeline> {
        &self.pipeline
    }

    pub fn start(&self, request: ScrapeRequestDto) -> Result<ScrapeStartedDto, ScrapeUseCaseError> {
        let message = self.pipeline.try_submit(&request.domain)?;
        Ok(ScrapeStartedDto::new(message))
    }

    pub fn status(&self) -> StatusResponseDto {
        let snapshot = self.pipeline.status();
        StatusResponseDto {
            status: snapshot.status,
            results_count: snapshot.results_count,
        }
    }

    /// 会话日志
    ///
    /// 有实时日志时按发出顺序返回；否则回放最近的持久化日志（新的在前）
    pub async fn logs(&self) -> Result<Vec<LogLineDto>, ScrapeUseCaseError> {
        let live = self.pipeline.logs();
        if !live.is_empty() {
            return Ok(live.into_iter().map(LogLineDto::from).collect());
        }

        let history = self.repository.recent_logs(HISTORY_LOG_LIMIT).await?;
        Ok(history.into_iter().map(LogLineDto::from).collect())
    }

    pub fn stop(&self) -> Result<MessageResponseDto, ScrapeUseCaseError> {
        if !self.pipeline.request_stop() {
            return Err(PipelineError::NotRunning.into());
        }
        Ok(MessageResponseDto::new("Stop requested"))
    }

    /// 清空持久化数据和内存中的会话数据，抓取中时拒绝
    pub async fn clear(&self) -> Result<MessageResponseDto, ScrapeUseCaseError> {
        self.pipeline.clear()?;
        self.repository.clear_all().await?;
        Ok(MessageResponseDto::new("All data cleared"))
    }
}
