// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 日志级别
///
/// 决定日志行的前缀，便于在日志流中区分失败与进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Page,
    Email,
    Stats,
    Search,
    Success,
    Complete,
    Warning,
    Error,
    Stop,
}

impl LogLevel {
    /// 日志行前缀
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "",
            LogLevel::Page => "[PAGE] ",
            LogLevel::Email => "[EMAIL] ",
            LogLevel::Stats => "[STATS] ",
            LogLevel::Search => "[SEARCH] ",
            LogLevel::Success => "[SUCCESS] ",
            LogLevel::Complete => "[COMPLETE] ",
            LogLevel::Warning => "[WARNING] ",
            LogLevel::Error => "[ERROR] ",
            LogLevel::Stop => "[STOP] ",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LogLevel::Warning | LogLevel::Error)
    }
}

/// 会话日志条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 会话内单调递增的序号
    pub seq: u64,
    /// 时间戳（会话内单调不减）
    pub timestamp: DateTime<Utc>,
    /// 级别
    pub level: LogLevel,
    /// 带级别前缀的完整消息
    pub message: String,
}

impl LogEntry {
    pub fn new(seq: u64, timestamp: DateTime<Utc>, level: LogLevel, text: &str) -> Self {
        Self {
            seq,
            timestamp,
            level,
            message: format!("{}{}", level.prefix(), text),
        }
    }

    /// 展示用的时间格式（时:分:秒）
    pub fn clock(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.clock(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_levels_carry_severity_prefix() {
        let entry = LogEntry::new(0, Utc::now(), LogLevel::Error, "No URLs found for a.com");
        assert_eq!(entry.message, "[ERROR] No URLs found for a.com");

        let entry = LogEntry::new(1, Utc::now(), LogLevel::Warning, "No content found");
        assert!(entry.message.starts_with("[WARNING]"));
        assert!(entry.level.is_failure());

        let entry = LogEntry::new(2, Utc::now(), LogLevel::Info, "Starting");
        assert_eq!(entry.message, "Starting");
        assert!(!entry.level.is_failure());
    }
}
