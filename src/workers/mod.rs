// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供抓取会话的编排和并发控制
/// 包括会话状态机、有界任务组和三阶段抓取流水线
pub mod pipeline;
pub mod session_state;
pub mod task_group;

pub use pipeline::ScrapePipeline;
