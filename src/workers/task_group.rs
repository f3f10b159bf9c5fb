// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinSet;

/// 任务失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// 任务内部 panic
    Panicked(String),
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFailure::Panicked(msg) => write!(f, "task panicked: {}", msg),
        }
    }
}

type Finished<K, T> = (K, Result<T, TaskFailure>);

/// 有界任务组
///
/// 同时运行的任务数不超过 `limit`，其余任务排队；每完成一个再补充一个。
/// 任务的 panic 被捕获并作为 [`TaskFailure::Panicked`] 返回，不会影响其他任务。
/// 完成顺序不确定。
pub struct TaskGroup<K, T> {
    running: JoinSet<Finished<K, T>>,
    queued: VecDeque<(K, BoxFuture<'static, T>)>,
    limit: usize,
}

impl<K, T> TaskGroup<K, T>
where
    K: Send + 'static,
    T: Send + 'static,
{
    /// 创建任务组，`limit` 至少为 1
    pub fn new(limit: usize) -> Self {
        Self {
            running: JoinSet::new(),
            queued: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// 并发上限
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 添加任务，`key` 用于在完成时识别任务
    pub fn push<F>(&mut self, key: K, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.queued.push_back((key, task.boxed()));
        self.fill();
    }

    /// 尚未完成的任务数（运行中 + 排队中）
    pub fn len(&self) -> usize {
        self.running.len() + self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 等待下一个任务完成
    ///
    /// 所有任务都完成后返回 `None`
    pub async fn next(&mut self) -> Option<Finished<K, T>> {
        loop {
            self.fill();
            let joined = self.running.join_next().await?;
            self.fill();

            match joined {
                Ok(finished) => return Some(finished),
                // Panics are caught inside the task, so only aborted tasks land here
                Err(e) => tracing::debug!("task join failed: {}", e),
            }
        }
    }

    /// 放弃排队任务并中止所有运行中的任务
    pub fn abort_all(&mut self) {
        self.queued.clear();
        self.running.abort_all();
    }

    fn fill(&mut self) {
        while self.running.len() < self.limit {
            let Some((key, task)) = self.queued.pop_front() else {
                break;
            };
            self.running.spawn(async move {
                let outcome = AssertUnwindSafe(task)
                    .catch_unwind()
                    .await
                    .map_err(|payload| TaskFailure::Panicked(panic_message(payload)));
                (key, outcome)
            });
        }
    }
}

/// 从 panic 负载中提取可读消息
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
