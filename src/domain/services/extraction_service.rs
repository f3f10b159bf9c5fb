// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::settings::PipelineSettings;
use crate::domain::models::email::PageResult;
use crate::utils::url_utils::normalize_domain;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}\b")
        .expect("email regex must compile")
});

/// 看起来像邮箱、实际上是资源文件名的后缀（如 `logo@2x.png`）
const FILE_EXTENSIONS: [&str; 12] = [
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "css", "js", "pdf", "mp4",
];

/// 提取服务
///
/// 从页面文本中提取真实出现的邮箱地址，并根据角色前缀生成候选地址。
/// 所有地址在去重前统一转换为小写。
#[derive(Debug, Clone)]
pub struct ExtractionService {
    /// 角色前缀（已去重、小写）
    role_prefixes: Vec<String>,
    /// 每页最多保留的发现邮箱数
    max_emails_per_page: usize,
}

impl Default for ExtractionService {
    fn default() -> Self {
        Self::new(&PipelineSettings::default())
    }
}

impl ExtractionService {
    /// 创建新的提取服务实例
    ///
    /// # 参数
    ///
    /// * `settings` - 流水线配置，提供角色前缀和每页上限
    pub fn new(settings: &PipelineSettings) -> Self {
        let mut seen = HashSet::new();
        let role_prefixes = settings
            .role_prefixes
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty() && seen.insert(p.clone()))
            .collect();

        Self {
            role_prefixes,
            max_emails_per_page: settings.max_emails_per_page,
        }
    }

    /// 角色前缀列表
    pub fn role_prefixes(&self) -> &[String] {
        &self.role_prefixes
    }

    /// 地址的本地部分是否为角色前缀
    pub fn is_role_address(&self, email: &str) -> bool {
        email
            .split_once('@')
            .map(|(local, _)| self.role_prefixes.iter().any(|p| p == local))
            .unwrap_or(false)
    }

    /// 提取页面中出现的邮箱
    ///
    /// 按首次出现顺序保留至多 `max_emails_per_page` 个地址
    pub fn find_emails(&self, page_text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for m in EMAIL_REGEX.find_iter(page_text) {
            if found.len() >= self.max_emails_per_page {
                break;
            }
            let email = m.as_str().trim_matches('.').to_lowercase();
            if is_plausible_match(&email) {
                found.insert(email);
            }
        }
        found
    }

    /// 为域名生成角色候选邮箱
    pub fn generate_emails(&self, domain: &str) -> BTreeSet<String> {
        let domain = normalize_domain(domain);
        if domain.is_empty() {
            return BTreeSet::new();
        }
        self.role_prefixes
            .iter()
            .map(|prefix| format!("{}@{}", prefix, domain))
            .collect()
    }

    /// 提取并生成邮箱
    ///
    /// # 参数
    ///
    /// * `page_text` - 页面文本
    /// * `domain` - 目标域名
    ///
    /// # 返回值
    ///
    /// 返回 `(发现的邮箱, 生成的邮箱)`，相同输入始终得到相同输出
    pub fn extract(&self, page_text: &str, domain: &str) -> (BTreeSet<String>, BTreeSet<String>) {
        (self.find_emails(page_text), self.generate_emails(domain))
    }

    /// 处理单个页面，附带邮箱来源
    pub fn extract_page(&self, url: &str, page_text: &str, domain: &str) -> PageResult {
        let (found, generated) = self.extract(page_text, domain);
        let sources: BTreeMap<String, Vec<String>> = found
            .iter()
            .map(|email| (email.clone(), vec![url.to_string()]))
            .collect();

        PageResult {
            url: url.to_string(),
            found,
            generated,
            sources,
        }
    }
}

fn is_plausible_match(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.starts_with('.') || local.contains("..") {
        return false;
    }
    let tld = domain.rsplit('.').next().unwrap_or_default();
    !FILE_EXTENSIONS.contains(&tld)
}

#[cfg(test)]
#[path = "extraction_service_test.rs"]
mod tests;
