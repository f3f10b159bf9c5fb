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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 默认的角色前缀列表
pub const DEFAULT_ROLE_PREFIXES: [&str; 8] = [
    "info", "contact", "sales", "support", "admin", "hello", "team", "office",
];

/// 应用程序配置设置
///
/// 包含服务器、数据库、爬虫、验证器和流水线的所有配置项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 爬虫配置
    pub crawler: CrawlerSettings,
    /// 邮箱验证配置
    pub verifier: VerifierSettings,
    /// 流水线配置
    pub pipeline: PipelineSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// Prometheus 指标监听地址，为空时不启动
    pub metrics_addr: String,
    /// 是否输出 JSON 格式日志
    pub json_logs: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            metrics_addr: "0.0.0.0:9000".to_string(),
            json_logs: false,
        }
    }
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 是否启用持久化，关闭时使用内存仓库
    pub enabled: bool,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://emailscope.db?mode=rwc".to_string(),
            enabled: true,
            max_connections: Some(5),
            min_connections: Some(1),
            connect_timeout: Some(10),
            idle_timeout: Some(300),
        }
    }
}

/// 爬虫配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 两次请求之间的最小间隔（毫秒）
    pub request_delay_ms: u64,
    /// 单次请求超时时间（秒）
    pub fetch_timeout_secs: u64,
    /// 是否跳过 robots.txt 检查
    pub bypass_robots_policy: bool,
    /// 最大爬取深度
    pub max_crawl_depth: usize,
    /// 每个域名最多收集的页面数
    pub max_pages_per_domain: usize,
    /// 全局限流间隔（毫秒）
    pub rate_limit_interval_ms: u64,
    /// 每个URL的请求尝试次数
    pub request_retries: u32,
    /// 请求使用的 User-Agent
    pub user_agent: String,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            request_delay_ms: 500,
            fetch_timeout_secs: 10,
            bypass_robots_policy: false,
            max_crawl_depth: 2,
            max_pages_per_domain: 30,
            rate_limit_interval_ms: 800,
            request_retries: 3,
            user_agent: "Mozilla/5.0 (compatible; emailscope/0.1)".to_string(),
        }
    }
}

impl CrawlerSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// 限流闸门使用的间隔，取请求延迟与限流间隔中较大者
    pub fn gate_interval(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms.max(self.rate_limit_interval_ms))
    }

    /// 每个URL的实际尝试次数，至少为 1
    pub fn attempts(&self) -> u32 {
        self.request_retries.max(1)
    }
}

/// 邮箱验证配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct VerifierSettings {
    /// MX 查询超时时间（秒）
    pub verification_timeout_secs: u64,
    /// 是否跳过 DNS 查询（模拟模式）
    pub mock_dns_mode: bool,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            verification_timeout_secs: 3,
            mock_dns_mode: false,
        }
    }
}

impl VerifierSettings {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }
}

/// 流水线配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// 页面处理并发数
    pub page_worker_concurrency: usize,
    /// 邮箱验证并发数
    pub verify_worker_concurrency: usize,
    /// 每页最多提取的邮箱数
    pub max_emails_per_page: usize,
    /// 每次会话最多验证的邮箱数
    pub max_total_emails: usize,
    /// 是否为每个工作单元启用超时保护
    pub timeout_protection_enabled: bool,
    /// 会话结束后回到空闲状态前的冷却时间（秒）
    pub cooldown_secs: u64,
    /// 用于生成候选邮箱的角色前缀
    pub role_prefixes: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_worker_concurrency: 5,
            verify_worker_concurrency: 10,
            max_emails_per_page: 100,
            max_total_emails: 500,
            timeout_protection_enabled: true,
            cooldown_secs: 5,
            role_prefixes: DEFAULT_ROLE_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl PipelineSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 以及 `EMAILSCOPE__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let defaults = Settings::default();
        let builder = Config::builder()
            // Server
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port)?
            .set_default("server.metrics_addr", defaults.server.metrics_addr)?
            .set_default("server.json_logs", defaults.server.json_logs)?
            // Database
            .set_default("database.url", defaults.database.url)?
            .set_default("database.enabled", defaults.database.enabled)?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Crawler
            .set_default("crawler.request_delay_ms", defaults.crawler.request_delay_ms)?
            .set_default("crawler.fetch_timeout_secs", defaults.crawler.fetch_timeout_secs)?
            .set_default(
                "crawler.bypass_robots_policy",
                defaults.crawler.bypass_robots_policy,
            )?
            .set_default(
                "crawler.max_crawl_depth",
                defaults.crawler.max_crawl_depth as u64,
            )?
            .set_default(
                "crawler.max_pages_per_domain",
                defaults.crawler.max_pages_per_domain as u64,
            )?
            .set_default(
                "crawler.rate_limit_interval_ms",
                defaults.crawler.rate_limit_interval_ms,
            )?
            .set_default("crawler.request_retries", defaults.crawler.request_retries)?
            .set_default("crawler.user_agent", defaults.crawler.user_agent)?
            // Verifier
            .set_default(
                "verifier.verification_timeout_secs",
                defaults.verifier.verification_timeout_secs,
            )?
            .set_default("verifier.mock_dns_mode", defaults.verifier.mock_dns_mode)?
            // Pipeline
            .set_default(
                "pipeline.page_worker_concurrency",
                defaults.pipeline.page_worker_concurrency as u64,
            )?
            .set_default(
                "pipeline.verify_worker_concurrency",
                defaults.pipeline.verify_worker_concurrency as u64,
            )?
            .set_default(
                "pipeline.max_emails_per_page",
                defaults.pipeline.max_emails_per_page as u64,
            )?
            .set_default(
                "pipeline.max_total_emails",
                defaults.pipeline.max_total_emails as u64,
            )?
            .set_default(
                "pipeline.timeout_protection_enabled",
                defaults.pipeline.timeout_protection_enabled,
            )?
            .set_default("pipeline.cooldown_secs", defaults.pipeline.cooldown_secs)?
            .set_default("pipeline.role_prefixes", defaults.pipeline.role_prefixes)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("EMAILSCOPE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pipeline.role_prefixes")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
