// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 会话（session）：一次针对单个域名的抓取运行及其状态
/// - 邮箱（email）：页面提取结果、验证结论与验证记录
/// - 日志（log_entry）：会话进度日志
/// - 报告（report）：会话报告与全局统计
pub mod email;
pub mod log_entry;
pub mod report;
pub mod session;
