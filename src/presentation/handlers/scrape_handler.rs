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

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::{
    application::{
        dto::{
            scrape_request::ScrapeRequestDto,
            scrape_response::{
                LogLineDto, MessageResponseDto, ScrapeStartedDto, StatusResponseDto,
            },
        },
        use_cases::scrape_use_case::ScrapeUseCase,
    },
    presentation::errors::AppError,
};

/// 开始抓取
pub async fn start_scrape(
    Extension(use_case): Extension<Arc<ScrapeUseCase>>,
    Json(payload): Json<ScrapeRequestDto>,
) -> Result<Json<ScrapeStartedDto>, AppError> {
    let started = use_case.start(payload)?;
    info!("{}", started.message);
    Ok(Json(started))
}

/// 当前会话状态
pub async fn get_status(
    Extension(use_case): Extension<Arc<ScrapeUseCase>>,
) -> Json<StatusResponseDto> {
    Json(use_case.status())
}

/// 会话日志
pub async fn get_logs(
    Extension(use_case): Extension<Arc<ScrapeUseCase>>,
) -> Result<Json<Vec<LogLineDto>>, AppError> {
    Ok(Json(use_case.logs().await?))
}

/// 请求停止当前会话
pub async fn stop_scrape(
    Extension(use_case): Extension<Arc<ScrapeUseCase>>,
) -> Result<Json<MessageResponseDto>, AppError> {
    Ok(Json(use_case.stop()?))
}

/// 清空全部数据
pub async fn clear_data(
    Extension(use_case): Extension<Arc<ScrapeUseCase>>,
) -> Result<Json<MessageResponseDto>, AppError> {
    Ok(Json(use_case.clear().await?))
}
