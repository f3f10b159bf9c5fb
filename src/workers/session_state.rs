// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::models::email::VerificationRecord;
use crate::domain::models::log_entry::{LogEntry, LogLevel};
use crate::domain::models::session::{Session, SessionStatus};
use crate::utils::errors::PipelineError;

/// 会话开始时分配的句柄
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub generation: u64,
    pub cancel: CancellationToken,
}

#[derive(Default)]
struct Inner {
    status: SessionStatus,
    generation: u64,
    session: Option<Session>,
    logs: Vec<LogEntry>,
    next_seq: u64,
    last_timestamp: Option<DateTime<Utc>>,
    results: Vec<VerificationRecord>,
    cancel: CancellationToken,
}

/// 进程内唯一的会话状态
///
/// 状态、日志序列和结果列表在同一把读写锁下更新，
/// 因此并发读者总能看到一致的快照。
/// `generation` 用来丢弃来自已结束会话的迟到写入。
#[derive(Default)]
pub struct SessionState {
    inner: RwLock<Inner>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试开始新会话
    ///
    /// 只有空闲状态可以开始；成功时清空上一会话的日志和结果
    pub fn try_begin(&self, domain: &str) -> Result<SessionTicket, PipelineError> {
        let mut inner = self.inner.write();
        if inner.status != SessionStatus::Idle {
            return Err(PipelineError::AlreadyRunning);
        }

        inner.generation += 1;
        inner.status = SessionStatus::Scraping;
        inner.session = Some(Session::start(inner.generation, domain));
        inner.logs.clear();
        inner.next_seq = 0;
        inner.last_timestamp = None;
        inner.results.clear();
        inner.cancel = CancellationToken::new();

        Ok(SessionTicket {
            generation: inner.generation,
            cancel: inner.cancel.clone(),
        })
    }

    /// 追加一行会话日志，并同步输出为 tracing 事件
    ///
    /// 序号在锁内分配，时间戳被钳制为不早于上一条。
    /// 会话离开抓取状态后日志不再变化，此时返回 `None`
    pub fn append_log(&self, generation: u64, level: LogLevel, text: &str) -> Option<LogEntry> {
        let (entry, domain) = {
            let mut inner = self.inner.write();
            if inner.generation != generation || inner.status != SessionStatus::Scraping {
                debug!(generation, "Dropping log line for finished session: {}", text);
                return None;
            }
            let now = Utc::now();
            let timestamp = match inner.last_timestamp {
                Some(last) if last > now => last,
                _ => now,
            };
            let entry = LogEntry::new(inner.next_seq, timestamp, level, text);
            inner.next_seq += 1;
            inner.last_timestamp = Some(timestamp);
            inner.logs.push(entry.clone());
            let domain = inner
                .session
                .as_ref()
                .map(|s| s.domain.clone())
                .unwrap_or_default();
            (entry, domain)
        };

        match level {
            LogLevel::Error => error!(domain = %domain, "{}", entry.message),
            LogLevel::Warning => warn!(domain = %domain, "{}", entry.message),
            _ => info!(domain = %domain, "{}", entry.message),
        }
        Some(entry)
    }

    /// 追加验证记录
    ///
    /// 仅当会话仍在抓取且未收到停止请求时写入，返回记录下标
    pub fn push_result(&self, generation: u64, record: VerificationRecord) -> Option<usize> {
        let mut inner = self.inner.write();
        if inner.generation != generation
            || inner.status != SessionStatus::Scraping
            || inner.cancel.is_cancelled()
        {
            return None;
        }
        inner.results.push(record);
        Some(inner.results.len() - 1)
    }

    /// 持久化成功后回填记录ID
    pub fn set_result_id(&self, generation: u64, index: usize, id: i32) {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return;
        }
        if let Some(record) = inner.results.get_mut(index) {
            record.id = Some(id);
        }
    }

    /// 记录持久化层分配的ID
    pub fn attach_ids(&self, generation: u64, domain_id: Option<i32>, session_id: Option<i32>) {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return;
        }
        if let Some(session) = inner.session.as_mut() {
            session.domain_id = domain_id;
            session.session_id = session_id;
        }
    }

    /// 构造终止后的会话快照，但不改变状态
    ///
    /// 供调用方在状态切换前完成持久化；当前会话不在抓取中时返回 `None`
    pub fn closing(
        &self,
        generation: u64,
        status: SessionStatus,
        found: usize,
        verified: usize,
    ) -> Option<Session> {
        debug_assert!(status.is_terminal());
        let inner = self.inner.read();
        if inner.generation != generation || inner.status != SessionStatus::Scraping {
            return None;
        }

        let mut session = inner.session.clone()?;
        session.status = status;
        session.completed_at = Some(Utc::now());
        session.total_emails_found = found;
        session.total_emails_verified = verified;
        Some(session)
    }

    /// 以给定快照进入终止状态
    pub fn finish_with(&self, generation: u64, session: Session) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation || inner.status != SessionStatus::Scraping {
            return false;
        }
        inner.status = session.status;
        inner.session = Some(session);
        true
    }

    /// 进入终止状态
    ///
    /// 只有当前会话处于抓取中时生效；返回会话快照
    pub fn finish(
        &self,
        generation: u64,
        status: SessionStatus,
        found: usize,
        verified: usize,
    ) -> Option<Session> {
        let session = self.closing(generation, status, found, verified)?;
        self.finish_with(generation, session.clone()).then_some(session)
    }

    /// 请求停止当前会话
    ///
    /// 不在抓取中时返回 false
    pub fn request_stop(&self) -> bool {
        let inner = self.inner.read();
        if inner.status != SessionStatus::Scraping {
            return false;
        }
        inner.cancel.cancel();
        true
    }

    /// 冷却结束后回到空闲
    ///
    /// 若期间已开始新会话则不做任何事
    pub fn reset_to_idle(&self, generation: u64) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation || !inner.status.is_terminal() {
            return false;
        }
        inner.status = SessionStatus::Idle;
        if let Some(session) = inner.session.as_mut() {
            session.status = SessionStatus::Idle;
        }
        true
    }

    /// 清空内存中的日志与结果
    pub fn clear(&self) -> Result<(), PipelineError> {
        let mut inner = self.inner.write();
        if inner.status == SessionStatus::Scraping {
            return Err(PipelineError::AlreadyRunning);
        }
        inner.logs.clear();
        inner.results.clear();
        inner.next_seq = 0;
        inner.last_timestamp = None;
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.read().status
    }

    pub fn result_count(&self) -> usize {
        self.inner.read().results.len()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.read().session.clone()
    }

    /// 当前会话的持久化域名ID
    pub fn domain_id(&self, generation: u64) -> Option<i32> {
        let inner = self.inner.read();
        if inner.generation != generation {
            return None;
        }
        inner.session.as_ref().and_then(|s| s.domain_id)
    }

    /// 日志快照（按发出顺序）
    pub fn logs(&self) -> Vec<LogEntry> {
        self.inner.read().logs.clone()
    }

    /// 结果快照（按时间倒序）
    pub fn results(&self) -> Vec<VerificationRecord> {
        let mut results = self.inner.read().results.clone();
        results.reverse();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::email::{EmailSource, Verdict};
    use std::sync::Arc;

    fn record(email: &str) -> VerificationRecord {
        VerificationRecord::new(
            email,
            "example.com",
            EmailSource::Generated,
            Verdict::new(true, 50, "ok"),
        )
    }

    #[test]
    fn test_single_flight() {
        let state = SessionState::new();
        let ticket = state.try_begin("example.com").unwrap();
        assert_eq!(state.status(), SessionStatus::Scraping);
        assert!(matches!(
            state.try_begin("other.com"),
            Err(PipelineError::AlreadyRunning)
        ));

        state.finish(ticket.generation, SessionStatus::Completed, 0, 0);
        // Terminal states still reject until the cool-down resets to idle
        assert!(state.try_begin("other.com").is_err());
        assert!(state.reset_to_idle(ticket.generation));
        assert!(state.try_begin("other.com").is_ok());
    }

    #[test]
    fn test_new_session_resets_logs_and_results() {
        let state = SessionState::new();
        let first = state.try_begin("a.com").unwrap();
        state.append_log(first.generation, LogLevel::Info, "hello");
        state.push_result(first.generation, record("info@a.com"));
        state.finish(first.generation, SessionStatus::Completed, 1, 1);
        state.reset_to_idle(first.generation);

        let second = state.try_begin("b.com").unwrap();
        assert!(second.generation > first.generation);
        assert!(state.logs().is_empty());
        assert_eq!(state.result_count(), 0);
        assert!(!second.cancel.is_cancelled());
    }

    #[test]
    fn test_stop_blocks_further_results() {
        let state = SessionState::new();
        assert!(!state.request_stop());

        let ticket = state.try_begin("example.com").unwrap();
        assert_eq!(state.push_result(ticket.generation, record("a@example.com")), Some(0));
        assert!(state.request_stop());
        assert!(ticket.cancel.is_cancelled());
        assert_eq!(state.push_result(ticket.generation, record("b@example.com")), None);
        assert_eq!(state.result_count(), 1);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let state = SessionState::new();
        let first = state.try_begin("a.com").unwrap();
        state.finish(first.generation, SessionStatus::Error, 0, 0);
        state.reset_to_idle(first.generation);
        let second = state.try_begin("b.com").unwrap();

        assert!(state.push_result(first.generation, record("x@a.com")).is_none());
        assert!(state.finish(first.generation, SessionStatus::Completed, 0, 0).is_none());
        assert!(!state.reset_to_idle(first.generation));
        assert_eq!(state.status(), SessionStatus::Scraping);

        state.finish(second.generation, SessionStatus::Stopped, 0, 0);
        assert_eq!(state.status(), SessionStatus::Stopped);
    }

    #[test]
    fn test_concurrent_log_appends_keep_order() {
        let state = Arc::new(SessionState::new());
        let ticket = state.try_begin("example.com").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let state = state.clone();
                let generation = ticket.generation;
                std::thread::spawn(move || {
                    for i in 0..50 {
                        state.append_log(generation, LogLevel::Page, &format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let logs = state.logs();
        assert_eq!(logs.len(), 400);
        for (i, pair) in logs.windows(2).enumerate() {
            assert_eq!(pair[0].seq, i as u64);
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_clear_rejected_while_scraping() {
        let state = SessionState::new();
        let ticket = state.try_begin("example.com").unwrap();
        state.append_log(ticket.generation, LogLevel::Info, "line");
        assert!(state.clear().is_err());

        state.finish(ticket.generation, SessionStatus::Completed, 0, 0);
        state.clear().unwrap();
        assert!(state.logs().is_empty());
    }

    #[test]
    fn test_logs_are_frozen_after_terminal_state() {
        let state = SessionState::new();
        let ticket = state.try_begin("example.com").unwrap();
        assert!(state.append_log(ticket.generation, LogLevel::Info, "first").is_some());

        let closing = state
            .closing(ticket.generation, SessionStatus::Completed, 2, 1)
            .unwrap();
        assert_eq!(closing.total_emails_found, 2);
        // Snapshot alone does not leave the scraping state
        assert_eq!(state.status(), SessionStatus::Scraping);
        assert!(state.append_log(ticket.generation, LogLevel::Info, "second").is_some());

        assert!(state.finish_with(ticket.generation, closing));
        assert_eq!(state.status(), SessionStatus::Completed);
        assert!(state
            .append_log(ticket.generation, LogLevel::Warning, "late")
            .is_none());
        assert!(state.append_log(ticket.generation + 1, LogLevel::Info, "stale").is_none());

        let logs: Vec<String> = state.logs().into_iter().map(|l| l.message).collect();
        assert_eq!(logs, vec!["first", "second"]);
        assert_eq!(state.session().unwrap().total_emails_verified, 1);
    }
}
