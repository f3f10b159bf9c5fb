// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::utils::rate_gate::RateGate;
use crate::utils::retry_policy::RetryPolicy;

/// robots.txt 缓存有效期
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Robots.txt检查器接口
#[async_trait]
pub trait RobotsCheckerTrait: Send + Sync {
    /// 检查URL是否被允许访问
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool>;
    /// 获取爬取延迟
    async fn get_crawl_delay(&self, url_str: &str, user_agent: &str) -> Result<Option<Duration>>;
}

/// 缓存的Robots.txt内容
#[derive(Clone)]
struct CachedRobots {
    /// 内容
    content: String,

    /// 过期时间
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 按站点缓存 robots.txt；获取失败时视为没有限制。
#[derive(Clone)]
pub struct RobotsChecker {
    /// HTTP客户端
    client: Client,

    /// 内存缓存，键为站点的 robots.txt 地址
    memory_cache: Arc<DashMap<String, CachedRobots>>,

    /// 重试策略
    retry_policy: RetryPolicy,

    /// 单次请求超时
    timeout: Duration,

    /// 与页面抓取共享的请求闸门
    gate: RateGate,
}

#[async_trait]
impl RobotsCheckerTrait for RobotsChecker {
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool> {
        let content = self.get_robots_content(url_str, user_agent).await?;
        if content.is_empty() {
            return Ok(true);
        }
        let url = Url::parse(url_str)?;
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&content, user_agent, url.as_str()))
    }

    async fn get_crawl_delay(&self, url_str: &str, user_agent: &str) -> Result<Option<Duration>> {
        let content = self.get_robots_content(url_str, user_agent).await?;
        Ok(parse_crawl_delay(&content, user_agent))
    }
}

impl Default for RobotsChecker {
    fn default() -> Self {
        Self::new(Client::new(), RetryPolicy::default(), Duration::from_secs(5))
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    ///
    /// # 参数
    ///
    /// * `client` - 共享的HTTP客户端
    /// * `retry_policy` - 获取 robots.txt 时使用的重试策略
    /// * `timeout` - 单次请求超时
    pub fn new(client: Client, retry_policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            memory_cache: Arc::new(DashMap::new()),
            retry_policy,
            timeout,
            gate: RateGate::unlimited(),
        }
    }

    /// 让 robots.txt 请求经过共享闸门
    pub fn with_gate(mut self, gate: RateGate) -> Self {
        self.gate = gate;
        self
    }

    /// 获取Robots.txt内容（带缓存）
    async fn get_robots_content(&self, url_str: &str, user_agent: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        if url.host_str().is_none() {
            return Err(anyhow::anyhow!("Invalid URL: {}", url_str));
        }
        let robots_url = url.join("/robots.txt")?.to_string();

        if let Some(cached) = self.memory_cache.get(&robots_url) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.content.clone());
            }
        }

        let content = self.fetch_robots(&robots_url, user_agent).await;

        self.memory_cache.insert(
            robots_url,
            CachedRobots {
                content: content.clone(),
                expires_at: Instant::now() + CACHE_TTL,
            },
        );

        Ok(content)
    }

    /// 带重试地下载 robots.txt，任何失败都返回空内容
    async fn fetch_robots(&self, robots_url: &str, user_agent: &str) -> String {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.retry_policy.max_attempts {
            attempt += 1;
            self.gate.acquire().await;
            let response = self
                .client
                .get(robots_url)
                .header(reqwest::header::USER_AGENT, user_agent)
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    return resp.text().await.unwrap_or_default();
                }
                Ok(resp) if resp.status().is_server_error() => {
                    last_error = Some(anyhow::anyhow!("Server error: {}", resp.status()));
                }
                // 404/403 等视为没有 robots.txt
                Ok(_) => return String::new(),
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Request failed: {}", e));
                }
            }

            if self.retry_policy.should_retry(attempt) {
                tokio::time::sleep(self.retry_policy.calculate_backoff(attempt)).await;
            }
        }

        if let Some(err) = last_error {
            tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, err);
        }
        String::new()
    }
}

/// 解析Crawl-delay指令
///
/// 优先使用与 User-Agent 匹配的分组，否则退回 `*` 分组
fn parse_crawl_delay(content: &str, user_agent: &str) -> Option<Duration> {
    let mut current_agent_matched = false;
    let mut delay: Option<f64> = None;
    let mut specific_agent_found = false;
    let agent_lower = user_agent.to_lowercase();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key == "user-agent" {
            if value == "*" {
                current_agent_matched = !specific_agent_found;
            } else if agent_lower.contains(&value.to_lowercase()) {
                current_agent_matched = true;
                if !specific_agent_found {
                    delay = None;
                }
                specific_agent_found = true;
            } else {
                current_agent_matched = false;
            }
        } else if key == "crawl-delay" && current_agent_matched {
            if let Ok(d) = value.parse::<f64>() {
                if d.is_finite() && d >= 0.0 {
                    delay = Some(d);
                }
            }
        }
    }

    delay.map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn checker() -> RobotsChecker {
        RobotsChecker::new(Client::new(), RetryPolicy::none(), Duration::from_secs(2))
    }

    #[test]
    fn test_parse_crawl_delay_prefers_specific_agent() {
        let content = "User-agent: *\nCrawl-delay: 5\n\nUser-agent: EmailScope\nCrawl-delay: 1.5\n";
        assert_eq!(
            parse_crawl_delay(content, "EmailScope/0.1"),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(
            parse_crawl_delay(content, "OtherBot"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(parse_crawl_delay("", "EmailScope"), None);
    }

    #[tokio::test]
    async fn test_disallowed_path_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let robots = checker();
        let public = format!("{}/about", server.uri());
        let private = format!("{}/private/team", server.uri());

        assert!(robots.is_allowed(&public, "EmailScope").await.unwrap());
        assert!(!robots.is_allowed(&private, "EmailScope").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_robots_allows_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/anything", server.uri());
        assert!(checker().is_allowed(&url, "EmailScope").await.unwrap());
    }

    #[tokio::test]
    async fn test_server_error_allows_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/anything", server.uri());
        assert!(checker().is_allowed(&url, "EmailScope").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_url_is_an_error() {
        assert!(checker().is_allowed("not a url", "EmailScope").await.is_err());
    }

    #[tokio::test]
    async fn test_robots_fetch_waits_for_shared_gate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
            .expect(1)
            .mount(&server)
            .await;

        let gate = RateGate::new(Duration::from_millis(150));
        let robots = checker().with_gate(gate.clone());
        // A page fetch has just used the gate
        gate.acquire().await;

        let start = Instant::now();
        let url = format!("{}/contact", server.uri());
        assert!(robots.is_allowed(&url, "EmailScope").await.unwrap());
        assert!(start.elapsed() >= Duration::from_millis(120));

        // Cached answers do not touch the gate again
        let start = Instant::now();
        assert!(robots.is_allowed(&url, "EmailScope").await.unwrap());
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
