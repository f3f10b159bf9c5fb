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
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;

/// 抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎，客户端在构造时创建并复用
#[derive(Clone)]
pub struct ReqwestEngine {
    client: Client,
}

impl ReqwestEngine {
    /// 根据爬虫配置创建引擎
    pub fn new(settings: &CrawlerSettings) -> Result<Self, EngineError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.fetch_timeout())
            .cookie_store(true)
            .build()?;
        Ok(Self { client })
    }

    /// 使用已有客户端创建引擎
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// 底层HTTP客户端
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 2xx 响应
    /// * `Err(EngineError)` - 网络错误、超时或非 2xx 状态码
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let start = Instant::now();
        let response = self
            .client
            .get(&request.url)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout
                } else {
                    EngineError::RequestFailed(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("text/html")
            .to_string();
        let final_url = response.url().to_string();

        let content = response.text().await?;

        Ok(FetchResponse {
            status_code: status.as_u16(),
            content,
            content_type,
            final_url,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
