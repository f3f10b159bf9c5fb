// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
/// 包括 robots.txt 检查、请求闸门、重试策略、遥测等
pub mod errors;
pub mod rate_gate;
pub mod retry_policy;
pub mod robots;
pub mod telemetry;
pub mod text_processing;
pub mod url_utils;
