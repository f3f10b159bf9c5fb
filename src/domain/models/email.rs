// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// 邮箱来源
///
/// 区分在页面中真实出现的地址与根据角色前缀推测生成的地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailSource {
    /// 页面中发现
    Found,
    /// 根据角色前缀生成
    Generated,
}

impl fmt::Display for EmailSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmailSource::Found => write!(f, "found"),
            EmailSource::Generated => write!(f, "generated"),
        }
    }
}

impl FromStr for EmailSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "found" => Ok(EmailSource::Found),
            "generated" => Ok(EmailSource::Generated),
            _ => Err(()),
        }
    }
}

/// 单页提取结果
///
/// 由一个页面处理任务产生，聚合后即被丢弃
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// 页面URL
    pub url: String,
    /// 页面中发现的邮箱
    pub found: BTreeSet<String>,
    /// 生成的候选邮箱
    pub generated: BTreeSet<String>,
    /// 邮箱 → 出现该邮箱的页面列表
    pub sources: BTreeMap<String, Vec<String>>,
}

impl PageResult {
    /// 空结果，用于抓取失败或被跳过的页面
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.found.union(&self.generated).count()
    }
}

/// 验证结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// 是否认为有效
    pub is_valid: bool,
    /// 置信度（0-100）
    pub confidence: u8,
    /// 可读的原因说明
    pub reason: String,
}

impl Verdict {
    pub fn new(is_valid: bool, confidence: u8, reason: impl Into<String>) -> Self {
        Self {
            is_valid,
            confidence: confidence.min(100),
            reason: reason.into(),
        }
    }
}

/// 验证记录
///
/// 每个候选邮箱验证后产生一条，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// 持久化层返回的ID（持久化失败时为空）
    pub id: Option<i32>,
    /// 邮箱地址
    pub email: String,
    /// 所属域名
    pub domain: String,
    /// 置信度（0-100）
    pub confidence: u8,
    /// 是否有效
    pub is_valid: bool,
    /// 原因说明
    pub reason: String,
    /// 邮箱来源
    pub source: EmailSource,
    /// 发现该邮箱的页面（生成的地址为空）
    #[serde(default)]
    pub pages: Vec<String>,
    /// 创建时间
    pub timestamp: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn new(
        email: impl Into<String>,
        domain: impl Into<String>,
        source: EmailSource,
        verdict: Verdict,
    ) -> Self {
        Self {
            id: None,
            email: email.into(),
            domain: domain.into(),
            confidence: verdict.confidence,
            is_valid: verdict.is_valid,
            reason: verdict.reason,
            source,
            pages: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_pages(mut self, pages: Vec<String>) -> Self {
        self.pages = pages;
        self
    }

    /// 面向展示的状态文本
    pub fn display_status(&self) -> &'static str {
        if self.is_valid {
            "verified"
        } else {
            "unverified"
        }
    }
}
