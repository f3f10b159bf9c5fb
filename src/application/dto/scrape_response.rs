// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::log_entry::LogEntry;
use crate::domain::models::session::SessionStatus;
use crate::domain::repositories::scrape_repository::{StoredEmail, StoredLog};

/// 抓取已开始的响应
#[derive(Debug, Deserialize, Serialize)]
pub struct ScrapeStartedDto {
    pub status: String,
    pub message: String,
}

impl ScrapeStartedDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "started".to_string(),
            message: message.into(),
        }
    }
}

/// 会话状态响应
#[derive(Debug, Deserialize, Serialize)]
pub struct StatusResponseDto {
    pub status: SessionStatus,
    pub results_count: usize,
}

/// 只有一条消息的响应
#[derive(Debug, Deserialize, Serialize)]
pub struct MessageResponseDto {
    pub message: String,
}

impl MessageResponseDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 低置信度清理的响应
#[derive(Debug, Deserialize, Serialize)]
pub struct CleanupResponseDto {
    pub message: String,
    pub removed_count: u64,
}

/// 邮箱结果
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EmailResultDto {
    pub id: i32,
    pub email: String,
    pub domain: String,
    pub confidence: i32,
    pub is_valid: bool,
    pub reason: String,
    pub source: String,
    /// verified / unverified
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoredEmail> for EmailResultDto {
    fn from(email: StoredEmail) -> Self {
        let status = if email.is_valid { "verified" } else { "unverified" };
        Self {
            id: email.id,
            email: email.email,
            domain: email.domain,
            confidence: email.confidence,
            is_valid: email.is_valid,
            reason: email.reason,
            source: email.source,
            status: status.to_string(),
            created_at: email.created_at,
        }
    }
}

/// 日志行
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogLineDto {
    /// 时:分:秒
    pub timestamp: String,
    pub message: String,
}

impl From<LogEntry> for LogLineDto {
    fn from(entry: LogEntry) -> Self {
        Self {
            timestamp: entry.clock(),
            message: entry.message,
        }
    }
}

impl From<StoredLog> for LogLineDto {
    fn from(log: StoredLog) -> Self {
        Self {
            timestamp: log.timestamp.format("%H:%M:%S").to_string(),
            message: log.message,
        }
    }
}
