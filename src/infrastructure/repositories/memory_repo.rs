// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::session::SessionStatus;
use crate::domain::repositories::scrape_repository::{
    DomainExport, DomainSummary, DomainUpdate, NewEmail, RepositoryError, ScrapeRepository,
    SessionSummary, SessionUpdate, StoredEmail, StoredLog,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Default)]
struct MemoryState {
    next_id: i32,
    domains: Vec<DomainSummary>,
    sessions: Vec<SessionSummary>,
    emails: Vec<StoredEmail>,
    logs: Vec<StoredLog>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn domain_name(&self, id: i32) -> String {
        self.domains
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.domain.clone())
            .unwrap_or_default()
    }
}

/// 内存实现的抓取数据仓库
///
/// 数据库关闭时使用，也用于测试
#[derive(Default)]
pub struct MemoryScrapeRepository {
    state: Mutex<MemoryState>,
}

impl MemoryScrapeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 按创建时间倒序、ID 倒序排列
fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (DateTime<Utc>, i32),
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl ScrapeRepository for MemoryScrapeRepository {
    async fn add_domain(&self, name: &str, status: SessionStatus) -> Result<i32, RepositoryError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.domains.iter_mut().find(|d| d.domain == name) {
            existing.status = status.to_string();
            return Ok(existing.id);
        }
        let id = state.next_id();
        state.domains.push(DomainSummary {
            id,
            domain: name.to_string(),
            status: status.to_string(),
            total_emails: 0,
            verified_emails: 0,
            created_at: Utc::now(),
            last_scraped_at: None,
        });
        Ok(id)
    }

    async fn start_session(&self, domain_id: i32) -> Result<i32, RepositoryError> {
        let mut state = self.state.lock();
        let domain = state.domain_name(domain_id);
        let id = state.next_id();
        state.sessions.push(SessionSummary {
            id,
            domain_id,
            domain,
            status: SessionStatus::Scraping.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            total_emails_found: 0,
            total_emails_verified: 0,
        });
        Ok(id)
    }

    async fn update_domain_status(
        &self,
        domain_id: i32,
        update: DomainUpdate,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        let domain = state
            .domains
            .iter_mut()
            .find(|d| d.id == domain_id)
            .ok_or(RepositoryError::NotFound)?;

        domain.status = update.status.to_string();
        if let Some(total) = update.total_emails {
            domain.total_emails = total as i32;
        }
        if let Some(verified) = update.verified_emails {
            domain.verified_emails = verified as i32;
        }
        if update.last_scraped_at.is_some() {
            domain.last_scraped_at = update.last_scraped_at;
        }
        Ok(())
    }

    async fn update_session(
        &self,
        session_id: i32,
        update: SessionUpdate,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(RepositoryError::NotFound)?;

        session.status = update.status.to_string();
        if let Some(found) = update.total_emails_found {
            session.total_emails_found = found as i32;
        }
        if let Some(verified) = update.total_emails_verified {
            session.total_emails_verified = verified as i32;
        }
        if update.completed_at.is_some() {
            session.completed_at = update.completed_at;
        }
        Ok(())
    }

    async fn add_email(&self, domain_id: i32, email: NewEmail) -> Result<i32, RepositoryError> {
        let mut state = self.state.lock();
        if let Some(existing) = state
            .emails
            .iter_mut()
            .find(|e| e.domain_id == domain_id && e.email == email.email)
        {
            existing.confidence = email.confidence as i32;
            existing.is_valid = email.is_valid;
            existing.reason = email.reason;
            existing.source = email.source.to_string();
            existing.created_at = Utc::now();
            return Ok(existing.id);
        }

        let domain = state.domain_name(domain_id);
        let id = state.next_id();
        state.emails.push(StoredEmail {
            id,
            domain_id,
            domain,
            email: email.email,
            confidence: email.confidence as i32,
            is_valid: email.is_valid,
            reason: email.reason,
            source: email.source.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn add_log(
        &self,
        domain_id: i32,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.logs.push(StoredLog {
            id,
            domain_id,
            timestamp,
            message: message.to_string(),
        });
        Ok(())
    }

    async fn all_domains(&self) -> Result<Vec<DomainSummary>, RepositoryError> {
        let mut domains = self.state.lock().domains.clone();
        newest_first(&mut domains, |d| (d.created_at, d.id));
        Ok(domains)
    }

    async fn emails_by_domain(&self, domain: &str) -> Result<Vec<StoredEmail>, RepositoryError> {
        let mut emails: Vec<StoredEmail> = self
            .state
            .lock()
            .emails
            .iter()
            .filter(|e| e.domain == domain)
            .cloned()
            .collect();
        newest_first(&mut emails, |e| (e.created_at, e.id));
        Ok(emails)
    }

    async fn all_emails(&self) -> Result<Vec<StoredEmail>, RepositoryError> {
        let mut emails = self.state.lock().emails.clone();
        newest_first(&mut emails, |e| (e.created_at, e.id));
        Ok(emails)
    }

    async fn recent_logs(&self, limit: u64) -> Result<Vec<StoredLog>, RepositoryError> {
        let state = self.state.lock();
        Ok(state
            .logs
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn logs_by_domain(&self, domain_id: i32) -> Result<Vec<StoredLog>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .logs
            .iter()
            .filter(|l| l.domain_id == domain_id)
            .cloned()
            .collect())
    }

    async fn recent_sessions(&self, limit: u64) -> Result<Vec<SessionSummary>, RepositoryError> {
        let mut sessions = self.state.lock().sessions.clone();
        newest_first(&mut sessions, |s| (s.started_at, s.id));
        sessions.truncate(limit as usize);
        Ok(sessions)
    }

    async fn export_domain(&self, domain: &str) -> Result<Option<DomainExport>, RepositoryError> {
        let summary = {
            let state = self.state.lock();
            state.domains.iter().find(|d| d.domain == domain).cloned()
        };
        let Some(summary) = summary else {
            return Ok(None);
        };

        let emails = self.emails_by_domain(domain).await?;
        let logs = self.logs_by_domain(summary.id).await?;
        let mut sessions: Vec<SessionSummary> = self
            .state
            .lock()
            .sessions
            .iter()
            .filter(|s| s.domain_id == summary.id)
            .cloned()
            .collect();
        newest_first(&mut sessions, |s| (s.started_at, s.id));

        Ok(Some(DomainExport {
            domain: summary,
            emails,
            sessions,
            logs,
        }))
    }

    async fn clear_all(&self) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        state.domains.clear();
        state.sessions.clear();
        state.emails.clear();
        state.logs.clear();
        Ok(())
    }

    async fn delete_low_confidence(&self, threshold: u8) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock();
        let before = state.emails.len();
        state.emails.retain(|e| e.confidence >= threshold as i32);
        let removed = (before - state.emails.len()) as u64;

        let with_emails: HashSet<i32> = state.emails.iter().map(|e| e.domain_id).collect();
        state.domains.retain(|d| with_emails.contains(&d.id));
        state.sessions.retain(|s| with_emails.contains(&s.domain_id));
        state.logs.retain(|l| with_emails.contains(&l.domain_id));

        Ok(removed)
    }
}
