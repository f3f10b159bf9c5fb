// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use validator::ValidateEmail;

use crate::config::settings::{PipelineSettings, VerifierSettings};
use crate::domain::models::email::{EmailSource, Verdict};
use crate::domain::services::extraction_service::ExtractionService;

/// 基础分：MX 查询成功
const LIVE_BASELINE: u8 = 50;
/// 实时模式上限
const LIVE_CEILING: u8 = 95;
/// 模拟模式上限，严格低于实时模式
const MOCK_CEILING: u8 = 60;
/// MX 查询失败时的置信度
const NO_MAIL_SERVER_CONFIDENCE: u8 = 15;

/// MX 解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// 没有 MX 记录
    #[error("no mail server found for {0}")]
    NoRecords(String),
    /// 查询超时
    #[error("DNS lookup timed out for {0}")]
    Timeout(String),
    /// 其他解析失败
    #[error("DNS lookup failed: {0}")]
    Failed(String),
}

/// MX 记录解析器特质
#[async_trait]
pub trait MxResolver: Send + Sync {
    /// 查询域名的邮件交换主机，按优先级排序
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, ResolutionError>;
}

/// 邮箱验证服务
///
/// 三个阶段：语法检查、MX 查询、基于本地部分和来源的启发式调整。
/// 除只读配置外不持有可变状态，可被多个任务并发调用。
pub struct VerificationService {
    resolver: Option<Arc<dyn MxResolver>>,
    timeout: Duration,
    mock_dns: bool,
    extractor: ExtractionService,
}

impl VerificationService {
    /// 创建新的验证服务实例
    ///
    /// # 参数
    ///
    /// * `resolver` - MX 解析器；为 `None` 时等同于模拟模式
    /// * `settings` - 验证器配置
    /// * `pipeline` - 流水线配置，提供角色前缀
    pub fn new(
        resolver: Option<Arc<dyn MxResolver>>,
        settings: &VerifierSettings,
        pipeline: &PipelineSettings,
    ) -> Self {
        let mock_dns = settings.mock_dns_mode || resolver.is_none();
        Self {
            resolver,
            timeout: settings.verification_timeout(),
            mock_dns,
            extractor: ExtractionService::new(pipeline),
        }
    }

    /// 是否处于模拟模式
    pub fn is_mock(&self) -> bool {
        self.mock_dns
    }

    /// 验证单个邮箱
    ///
    /// # 参数
    ///
    /// * `email` - 候选邮箱
    /// * `source` - 邮箱来源，发现的地址比生成的地址获得更高的基础分
    ///
    /// # 返回值
    ///
    /// 返回验证结论；网络失败只会降低置信度，不会返回错误
    pub async fn verify(&self, email: &str, source: EmailSource) -> Verdict {
        let email = email.trim().to_lowercase();
        let Some(domain) = syntax_domain(&email) else {
            return Verdict::new(false, 0, "Invalid email syntax");
        };

        if self.mock_dns {
            let confidence = self.heuristic_score(&email, source, 35, MOCK_CEILING);
            return Verdict::new(
                true,
                confidence,
                format!("DNS check skipped (mock mode); {} address", source),
            );
        }

        let Some(resolver) = self.resolver.as_ref() else {
            return Verdict::new(false, 0, "No resolver configured");
        };

        let lookup = match tokio::time::timeout(self.timeout, resolver.lookup_mx(domain)).await {
            Ok(result) => result,
            Err(_) => Err(ResolutionError::Timeout(domain.to_string())),
        };

        match lookup {
            Ok(hosts) if !hosts.is_empty() => {
                let confidence = self.heuristic_score(&email, source, LIVE_BASELINE, LIVE_CEILING);
                Verdict::new(
                    true,
                    confidence,
                    format!("Mail server found ({}); {} address", hosts[0], source),
                )
            }
            Ok(_) => Verdict::new(
                false,
                NO_MAIL_SERVER_CONFIDENCE,
                format!("No mail server found for {}", domain),
            ),
            Err(e) => {
                tracing::debug!("MX lookup failed for {}: {}", domain, e);
                let reason = match e {
                    ResolutionError::Timeout(_) => format!("No mail server found ({})", e),
                    _ => format!("No mail server found for {}", domain),
                };
                Verdict::new(false, NO_MAIL_SERVER_CONFIDENCE, reason)
            }
        }
    }

    /// 基于来源和本地部分的启发式评分
    ///
    /// 发现的地址 +35，生成的角色地址 +15；
    /// 无回复类地址 -30，数字过多的本地部分 -10
    fn heuristic_score(&self, email: &str, source: EmailSource, base: u8, ceiling: u8) -> u8 {
        let local = email.split('@').next().unwrap_or_default();
        let mut score = base as i32;

        score += match source {
            EmailSource::Found => 35,
            EmailSource::Generated if self.extractor.is_role_address(email) => 15,
            EmailSource::Generated => 5,
        };

        if ["noreply", "no-reply", "donotreply", "do-not-reply"]
            .iter()
            .any(|p| local.starts_with(p))
        {
            score -= 30;
        }

        if local.chars().filter(|c| c.is_ascii_digit()).count() > 4 {
            score -= 10;
        }

        score.clamp(1, ceiling as i32) as u8
    }
}

/// 语法检查，通过时返回域名部分
fn syntax_domain(email: &str) -> Option<&str> {
    if email.len() > 254 || !email.to_string().validate_email() {
        return None;
    }
    let (_, domain) = email.rsplit_once('@')?;
    let labels_ok = domain.split('.').all(|l| !l.is_empty());
    if !domain.contains('.') || !labels_ok {
        return None;
    }
    Some(domain)
}

#[cfg(test)]
#[path = "verification_service_test.rs"]
mod tests;
