// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::sync::Arc;
use std::time::Duration;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// 全局请求闸门
///
/// 所有出站页面请求共享一个闸门，相邻两次放行至少间隔 `interval`。
/// 间隔为零时闸门不做限制。
#[derive(Clone)]
pub struct RateGate {
    limiter: Option<Arc<DirectLimiter>>,
    interval: Duration,
}

impl RateGate {
    /// 创建新的请求闸门
    pub fn new(interval: Duration) -> Self {
        // burst 固定为 1，保证严格的最小间隔
        let limiter = Quota::with_period(interval).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { limiter, interval }
    }

    /// 不限速的闸门
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// 最小放行间隔
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 等待直到允许发出下一个请求
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
