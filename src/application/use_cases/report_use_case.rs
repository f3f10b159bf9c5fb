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
    application::dto::scrape_response::{CleanupResponseDto, EmailResultDto},
    domain::{
        models::report::ScrapeStats,
        repositories::scrape_repository::{
            DomainExport, DomainSummary, RepositoryError, ScrapeRepository, SessionSummary,
        },
    },
    utils::url_utils::normalize_domain,
};
use std::sync::Arc;

/// 低于该置信度的邮箱会被清理
pub const LOW_CONFIDENCE_THRESHOLD: u8 = 30;
/// 会话列表返回的条数
pub const RECENT_SESSION_LIMIT: u64 = 20;

/// 报表用例
///
/// 只读查询持久化数据，外加低置信度清理
pub struct ReportUseCase {
    repository: Arc<dyn ScrapeRepository>,
}

impl ReportUseCase {
    pub fn new(repository: Arc<dyn ScrapeRepository>) -> Self {
        Self { repository }
    }

    /// 全局统计
    pub async fn stats(&self) -> Result<ScrapeStats, RepositoryError> {
        let domains = self.repository.all_domains().await?;
        let emails = self.repository.all_emails().await?;
        let verified = emails.iter().filter(|e| e.is_valid).count();
        Ok(ScrapeStats::new(domains.len(), emails.len(), verified))
    }

    /// 所有邮箱结果（新的在前）
    pub async fn results(&self) -> Result<Vec<EmailResultDto>, RepositoryError> {
        let emails = self.repository.all_emails().await?;
        Ok(emails.into_iter().map(EmailResultDto::from).collect())
    }

    pub async fn domains(&self) -> Result<Vec<DomainSummary>, RepositoryError> {
        self.repository.all_domains().await
    }

    pub async fn sessions(&self) -> Result<Vec<SessionSummary>, RepositoryError> {
        self.repository.recent_sessions(RECENT_SESSION_LIMIT).await
    }

    /// 导出单个域名，未知域名返回 `NotFound`
    pub async fn export(&self, domain: &str) -> Result<DomainExport, RepositoryError> {
        self.repository
            .export_domain(&normalize_domain(domain))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    pub async fn clean_low_confidence(&self) -> Result<CleanupResponseDto, RepositoryError> {
        let removed = self
            .repository
            .delete_low_confidence(LOW_CONFIDENCE_THRESHOLD)
            .await?;
        Ok(CleanupResponseDto {
            message: format!("Removed {} low-confidence emails", removed),
            removed_count: removed,
        })
    }
}
