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

use crate::config::settings::CrawlerSettings;
use crate::engines::traits::{EngineError, FetchRequest, FetchResponse, PageFetcher};
use crate::utils::rate_gate::RateGate;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::RobotsCheckerTrait;
use crate::utils::text_processing::html_to_text;
use crate::utils::url_utils::{same_host, seed_url};
use anyhow::Result;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// 不会包含网页内容的资源后缀
const SKIPPED_EXTENSIONS: [&str; 24] = [
    "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "bmp", "pdf", "doc", "docx", "xls",
    "xlsx", "ppt", "pptx", "zip", "rar", "gz", "tar", "mp3", "mp4", "avi", "css", "js",
];

/// 爬取服务
///
/// 从种子地址出发做同主机的广度优先遍历，并提供单页内容获取。
/// 所有请求经过同一个 [`RateGate`]。
pub struct CrawlService {
    /// 页面抓取引擎
    fetcher: Arc<dyn PageFetcher>,
    /// Robots.txt检查器
    robots_checker: Arc<dyn RobotsCheckerTrait>,
    /// 全局请求闸门
    gate: RateGate,
    /// 爬虫配置
    settings: CrawlerSettings,
    /// 重试策略
    retry_policy: RetryPolicy,
}

impl CrawlService {
    /// 创建新的爬取服务实例
    ///
    /// # 参数
    ///
    /// * `fetcher` - 页面抓取引擎
    /// * `robots_checker` - Robots.txt检查器
    /// * `gate` - 共享的请求闸门
    /// * `settings` - 爬虫配置
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        robots_checker: Arc<dyn RobotsCheckerTrait>,
        gate: RateGate,
        settings: CrawlerSettings,
    ) -> Self {
        let retry_policy = RetryPolicy::from_settings(&settings);
        Self {
            fetcher,
            robots_checker,
            gate,
            settings,
            retry_policy,
        }
    }

    /// 替换重试策略
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// 是否跳过 robots.txt
    pub fn bypasses_robots(&self) -> bool {
        self.settings.bypass_robots_policy
    }

    /// 爬取站点
    ///
    /// # 参数
    ///
    /// * `seed` - 种子地址或裸域名
    /// * `cancel` - 取消令牌，每次抓取前检查
    ///
    /// # 返回值
    ///
    /// 成功抓取到的同主机页面地址，按发现顺序排列，数量不超过 `max_pages_per_domain`
    pub async fn crawl(&self, seed: &str, cancel: &CancellationToken) -> Vec<String> {
        let Ok(seed) = Url::parse(&seed_url(seed)) else {
            tracing::warn!("Invalid seed URL: {}", seed);
            return Vec::new();
        };

        let max_pages = self.settings.max_pages_per_domain;
        let max_depth = self.settings.max_crawl_depth;
        let extra_delay = self.robots_crawl_delay(&seed).await;

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(Url, usize)> = VecDeque::new();
        let mut collected = Vec::new();

        visited.insert(seed.to_string());
        queue.push_back((seed.clone(), 0));

        while let Some((url, depth)) = queue.pop_front() {
            if collected.len() >= max_pages || cancel.is_cancelled() {
                break;
            }

            if !self.is_allowed(url.as_str()).await {
                tracing::debug!("Skipping {} (disallowed by robots.txt)", url);
                continue;
            }

            if !collected.is_empty() && !extra_delay.is_zero() {
                tokio::time::sleep(extra_delay).await;
            }

            let response = match self.fetch_with_retry(url.as_str()).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Dropping {} after failed fetch: {}", url, e);
                    continue;
                }
            };

            if !response.is_html() {
                continue;
            }
            collected.push(url.to_string());

            if depth >= max_depth {
                continue;
            }

            let links = match LinkDiscoverer::extract_links(&response.content, url.as_str()) {
                Ok(links) => links,
                Err(e) => {
                    tracing::debug!("Link extraction failed for {}: {}", url, e);
                    continue;
                }
            };

            for link in links {
                let Ok(next) = Url::parse(&link) else {
                    continue;
                };
                if !same_host(&seed, &next) || !LinkDiscoverer::is_crawlable(&next) {
                    continue;
                }
                if visited.insert(next.to_string()) {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        collected
    }

    /// 获取页面文本
    ///
    /// 去掉标记、保留 `mailto:` 目标；重试后仍失败时返回 `None`
    pub async fn fetch_content(&self, url: &str) -> Option<String> {
        match self.fetch_with_retry(url).await {
            Ok(response) => Some(html_to_text(&response.content)),
            Err(e) => {
                tracing::debug!("Fetch failed for {}: {}", url, e);
                None
            }
        }
    }

    /// 带重试的抓取，每次尝试都先经过请求闸门
    async fn fetch_with_retry(&self, url: &str) -> Result<FetchResponse, EngineError> {
        let request = FetchRequest::new(url, self.settings.fetch_timeout());
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.gate.acquire().await;

            match self.fetcher.fetch(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && self.retry_policy.should_retry(attempt) => {
                    let backoff = self.retry_policy.calculate_backoff(attempt);
                    tracing::debug!(
                        "Fetch attempt {} for {} failed: {}, retrying in {:?}",
                        attempt,
                        url,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn is_allowed(&self, url: &str) -> bool {
        if self.settings.bypass_robots_policy {
            return true;
        }
        match self
            .robots_checker
            .is_allowed(url, &self.settings.user_agent)
            .await
        {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::debug!("robots.txt check failed for {}: {}", url, e);
                true
            }
        }
    }

    /// robots.txt 中超出请求闸门间隔的那部分 Crawl-delay
    async fn robots_crawl_delay(&self, seed: &Url) -> Duration {
        if self.settings.bypass_robots_policy {
            return Duration::ZERO;
        }
        match self
            .robots_checker
            .get_crawl_delay(seed.as_str(), &self.settings.user_agent)
            .await
        {
            Ok(Some(delay)) => delay.saturating_sub(self.gate.interval()),
            _ => Duration::ZERO,
        }
    }
}

/// 链接发现器
///
/// 负责从HTML内容中提取和过滤链接
pub struct LinkDiscoverer;

impl LinkDiscoverer {
    /// 从HTML内容中提取链接
    ///
    /// # 参数
    ///
    /// * `html_content` - HTML内容
    /// * `base_url` - 基础URL
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<String>)` - 按文档顺序去重后的链接
    /// * `Err(anyhow::Error)` - 提取过程中出现的错误
    pub fn extract_links(html_content: &str, base_url: &str) -> Result<Vec<String>> {
        let fragment = Html::parse_document(html_content);
        let selector =
            Selector::parse("a").map_err(|e| anyhow::anyhow!("Invalid selector: {:?}", e))?;
        let base = Url::parse(base_url)?;
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in fragment.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            let lower = href.to_ascii_lowercase();
            // Ignore fragment identifiers, mailto, tel and javascript links
            if href.is_empty()
                || href.starts_with('#')
                || lower.starts_with("mailto:")
                || lower.starts_with("tel:")
                || lower.starts_with("javascript:")
            {
                continue;
            }

            if let Ok(mut url) = base.join(href) {
                if url.scheme() == "http" || url.scheme() == "https" {
                    url.set_fragment(None);
                    let link = url.to_string();
                    if seen.insert(link.clone()) {
                        links.push(link);
                    }
                }
            }
        }

        Ok(links)
    }

    /// 链接是否可能指向网页（而不是图片、文档等资源）
    pub fn is_crawlable(url: &Url) -> bool {
        let path = url.path().to_ascii_lowercase();
        let last = path.rsplit('/').next().unwrap_or_default();
        match last.rsplit_once('.') {
            Some((_, ext)) => !SKIPPED_EXTENSIONS.contains(&ext),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "crawl_service_test.rs"]
mod tests;
