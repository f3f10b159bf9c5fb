// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 抓取会话实体
///
/// 表示针对单个域名的一次完整的爬取-提取-验证运行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 会话序号，每次提交递增，用于区分前后两次会话
    pub generation: u64,
    /// 目标域名（已规范化）
    pub domain: String,
    /// 会话状态
    pub status: SessionStatus,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 完成时间（仅在进入终止状态后存在）
    pub completed_at: Option<DateTime<Utc>>,
    /// 发现的候选邮箱总数
    pub total_emails_found: usize,
    /// 验证通过的邮箱数
    pub total_emails_verified: usize,
    /// 持久化层中的域名ID
    pub domain_id: Option<i32>,
    /// 持久化层中的会话ID
    pub session_id: Option<i32>,
}

impl Session {
    /// 创建处于抓取状态的新会话
    pub fn start(generation: u64, domain: impl Into<String>) -> Self {
        Self {
            generation,
            domain: domain.into(),
            status: SessionStatus::Scraping,
            created_at: Utc::now(),
            completed_at: None,
            total_emails_found: 0,
            total_emails_verified: 0,
            domain_id: None,
            session_id: None,
        }
    }
}

/// 会话状态枚举
///
/// 状态转换遵循以下流程：
/// Idle → Scraping → Completed/Error/Stopped → (冷却后) Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// 空闲
    #[default]
    Idle,
    /// 抓取中
    Scraping,
    /// 已完成
    Completed,
    /// 出错
    Error,
    /// 已被用户停止
    Stopped,
}

impl SessionStatus {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Error | SessionStatus::Stopped
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Scraping => write!(f, "scraping"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Error => write!(f, "error"),
            SessionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(SessionStatus::Idle),
            "scraping" => Ok(SessionStatus::Scraping),
            "completed" => Ok(SessionStatus::Completed),
            "error" => Ok(SessionStatus::Error),
            "stopped" => Ok(SessionStatus::Stopped),
            _ => Err(()),
        }
    }
}
