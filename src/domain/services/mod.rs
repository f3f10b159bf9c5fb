// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务：
/// - 爬取服务（crawl_service）：同主机广度优先遍历和单页内容获取
/// - 提取服务（extraction_service）：从页面文本中提取邮箱并生成角色候选地址
/// - 验证服务（verification_service）：语法检查、MX 查询与置信度评分
///
/// 服务本身不持有会话状态，可被多个工作任务并发调用。
pub mod crawl_service;
pub mod extraction_service;
pub mod verification_service;
