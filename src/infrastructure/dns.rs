// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    TokioAsyncResolver,
};
use std::time::Duration;

use crate::domain::services::verification_service::{MxResolver, ResolutionError};

/// 基于 hickory 的 MX 解析器
pub struct HickoryMxResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryMxResolver {
    /// 使用系统默认上游创建解析器
    ///
    /// # 参数
    ///
    /// * `timeout` - 单次查询超时
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }
}

#[async_trait]
impl MxResolver for HickoryMxResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, ResolutionError> {
        let lookup = self.resolver.mx_lookup(domain).await.map_err(|e| match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => ResolutionError::NoRecords(domain.to_string()),
            ResolveErrorKind::Timeout => ResolutionError::Timeout(domain.to_string()),
            _ => ResolutionError::Failed(e.to_string()),
        })?;

        let mut records: Vec<(u16, String)> = lookup
            .iter()
            .map(|mx| {
                let host = mx.exchange().to_utf8();
                (mx.preference(), host.trim_end_matches('.').to_string())
            })
            .filter(|(_, host)| !host.is_empty())
            .collect();
        records.sort();

        if records.is_empty() {
            return Err(ResolutionError::NoRecords(domain.to_string()));
        }
        Ok(records.into_iter().map(|(_, host)| host).collect())
    }
}
