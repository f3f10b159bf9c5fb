// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::email::EmailSource;
use crate::domain::models::session::SessionStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 域名汇总信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub id: i32,
    pub domain: String,
    pub status: String,
    pub total_emails: i32,
    pub verified_emails: i32,
    pub created_at: DateTime<Utc>,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

/// 已保存的邮箱记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmail {
    pub id: i32,
    pub domain_id: i32,
    pub domain: String,
    pub email: String,
    pub confidence: i32,
    pub is_valid: bool,
    pub reason: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// 已保存的日志记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLog {
    pub id: i32,
    pub domain_id: i32,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// 会话汇总信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: i32,
    pub domain_id: i32,
    pub domain: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_emails_found: i32,
    pub total_emails_verified: i32,
}

/// 单个域名的完整导出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainExport {
    pub domain: DomainSummary,
    pub emails: Vec<StoredEmail>,
    pub sessions: Vec<SessionSummary>,
    pub logs: Vec<StoredLog>,
}

/// 新邮箱记录
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub email: String,
    pub confidence: u8,
    pub is_valid: bool,
    pub reason: String,
    pub source: EmailSource,
}

/// 域名状态更新
#[derive(Debug, Clone, Default)]
pub struct DomainUpdate {
    pub status: SessionStatus,
    pub total_emails: Option<usize>,
    pub verified_emails: Option<usize>,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

/// 会话状态更新
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub status: SessionStatus,
    pub total_emails_found: Option<usize>,
    pub total_emails_verified: Option<usize>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 抓取数据仓库特质
///
/// 定义域名、会话、邮箱和日志的持久化接口。流水线只使用写入方法，
/// 查询方法仅服务于报表接口。
#[async_trait]
pub trait ScrapeRepository: Send + Sync {
    /// 登记域名，已存在时更新其状态并返回原ID
    async fn add_domain(&self, name: &str, status: SessionStatus) -> Result<i32, RepositoryError>;

    /// 为域名开启新的抓取会话
    async fn start_session(&self, domain_id: i32) -> Result<i32, RepositoryError>;

    /// 更新域名状态与统计
    async fn update_domain_status(
        &self,
        domain_id: i32,
        update: DomainUpdate,
    ) -> Result<(), RepositoryError>;

    /// 更新会话状态与统计
    async fn update_session(
        &self,
        session_id: i32,
        update: SessionUpdate,
    ) -> Result<(), RepositoryError>;

    /// 保存邮箱验证结果，同一域名下重复的邮箱会被覆盖
    async fn add_email(&self, domain_id: i32, email: NewEmail) -> Result<i32, RepositoryError>;

    /// 追加一条会话日志
    async fn add_log(
        &self,
        domain_id: i32,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<(), RepositoryError>;

    /// 所有域名
    async fn all_domains(&self) -> Result<Vec<DomainSummary>, RepositoryError>;

    /// 指定域名下的所有邮箱
    async fn emails_by_domain(&self, domain: &str) -> Result<Vec<StoredEmail>, RepositoryError>;

    /// 所有域名下的邮箱（新的在前）
    async fn all_emails(&self) -> Result<Vec<StoredEmail>, RepositoryError>;

    /// 最近的日志（新的在前）
    async fn recent_logs(&self, limit: u64) -> Result<Vec<StoredLog>, RepositoryError>;

    /// 指定域名的所有日志（按时间顺序）
    async fn logs_by_domain(&self, domain_id: i32) -> Result<Vec<StoredLog>, RepositoryError>;

    /// 最近的会话（新的在前）
    async fn recent_sessions(&self, limit: u64) -> Result<Vec<SessionSummary>, RepositoryError>;

    /// 导出单个域名的全部数据
    async fn export_domain(&self, domain: &str) -> Result<Option<DomainExport>, RepositoryError>;

    /// 清空所有数据
    async fn clear_all(&self) -> Result<(), RepositoryError>;

    /// 删除低于阈值的邮箱，并清理不再有邮箱的域名及其会话和日志
    async fn delete_low_confidence(&self, threshold: u8) -> Result<u64, RepositoryError>;
}
