// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use super::email::VerificationRecord;
use super::session::SessionStatus;

/// 计算验证率（百分比），总数为 0 时返回 0
pub fn verification_rate(verified: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    verified as f64 / total as f64 * 100.0
}

/// 单次会话的最终报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub domain: String,
    pub status: SessionStatus,
    /// 按时间倒序排列的验证记录
    pub records: Vec<VerificationRecord>,
    pub total_emails: usize,
    pub verified_emails: usize,
    pub verification_rate: f64,
}

impl ScrapeReport {
    pub fn new(
        domain: impl Into<String>,
        status: SessionStatus,
        mut records: Vec<VerificationRecord>,
        total_emails: usize,
    ) -> Self {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.email.cmp(&b.email)));
        let verified_emails = records.iter().filter(|r| r.is_valid).count();
        Self {
            domain: domain.into(),
            status,
            records,
            total_emails,
            verified_emails,
            verification_rate: verification_rate(verified_emails, total_emails),
        }
    }
}

/// 全局统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeStats {
    pub total_domains: usize,
    pub total_emails: usize,
    pub verified_emails: usize,
    pub verification_rate: f64,
}

impl ScrapeStats {
    pub fn new(total_domains: usize, total_emails: usize, verified_emails: usize) -> Self {
        Self {
            total_domains,
            total_emails,
            verified_emails,
            verification_rate: verification_rate(verified_emails, total_emails),
        }
    }
}
