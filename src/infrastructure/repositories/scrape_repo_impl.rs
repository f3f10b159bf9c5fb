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

use crate::domain::models::session::SessionStatus;
use crate::domain::repositories::scrape_repository::{
    DomainExport, DomainSummary, DomainUpdate, NewEmail, RepositoryError, ScrapeRepository,
    SessionSummary, SessionUpdate, StoredEmail, StoredLog,
};
use crate::infrastructure::database::entities::{
    domain as domain_entity, email as email_entity, scraping_log as log_entity,
    scraping_session as session_entity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 抓取数据仓库实现（SeaORM）
pub struct SeaOrmScrapeRepository {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl SeaOrmScrapeRepository {
    /// 创建新的仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn domain_names(&self) -> Result<HashMap<i32, String>, RepositoryError> {
        let domains = domain_entity::Entity::find().all(self.db.as_ref()).await?;
        Ok(domains.into_iter().map(|d| (d.id, d.domain)).collect())
    }

    async fn find_domain(&self, name: &str) -> Result<Option<domain_entity::Model>, RepositoryError> {
        Ok(domain_entity::Entity::find()
            .filter(domain_entity::Column::Domain.eq(name))
            .one(self.db.as_ref())
            .await?)
    }
}

fn to_domain_summary(m: domain_entity::Model) -> DomainSummary {
    DomainSummary {
        id: m.id,
        domain: m.domain,
        status: m.status,
        total_emails: m.total_emails,
        verified_emails: m.verified_emails,
        created_at: m.created_at,
        last_scraped_at: m.last_scraped_at,
    }
}

fn to_stored_email(m: email_entity::Model, domain: String) -> StoredEmail {
    StoredEmail {
        id: m.id,
        domain_id: m.domain_id,
        domain,
        email: m.email,
        confidence: m.confidence,
        is_valid: m.is_valid,
        reason: m.reason,
        source: m.source,
        created_at: m.created_at,
    }
}

fn to_stored_log(m: log_entity::Model) -> StoredLog {
    StoredLog {
        id: m.id,
        domain_id: m.domain_id,
        timestamp: m.timestamp,
        message: m.message,
    }
}

fn to_session_summary(m: session_entity::Model, domain: String) -> SessionSummary {
    SessionSummary {
        id: m.id,
        domain_id: m.domain_id,
        domain,
        status: m.status,
        started_at: m.started_at,
        completed_at: m.completed_at,
        total_emails_found: m.total_emails_found,
        total_emails_verified: m.total_emails_verified,
    }
}

#[async_trait]
impl ScrapeRepository for SeaOrmScrapeRepository {
    async fn add_domain(&self, name: &str, status: SessionStatus) -> Result<i32, RepositoryError> {
        if let Some(existing) = self.find_domain(name).await? {
            let id = existing.id;
            let mut model: domain_entity::ActiveModel = existing.into();
            model.status = Set(status.to_string());
            model.update(self.db.as_ref()).await?;
            return Ok(id);
        }

        let model = domain_entity::ActiveModel {
            domain: Set(name.to_string()),
            status: Set(status.to_string()),
            total_emails: Set(0),
            verified_emails: Set(0),
            created_at: Set(Utc::now()),
            last_scraped_at: Set(None),
            ..Default::default()
        };
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.id)
    }

    async fn start_session(&self, domain_id: i32) -> Result<i32, RepositoryError> {
        let model = session_entity::ActiveModel {
            domain_id: Set(domain_id),
            status: Set(SessionStatus::Scraping.to_string()),
            started_at: Set(Utc::now()),
            completed_at: Set(None),
            total_emails_found: Set(0),
            total_emails_verified: Set(0),
            ..Default::default()
        };
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.id)
    }

    async fn update_domain_status(
        &self,
        domain_id: i32,
        update: DomainUpdate,
    ) -> Result<(), RepositoryError> {
        let mut model: domain_entity::ActiveModel = domain_entity::Entity::find_by_id(domain_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        model.status = Set(update.status.to_string());
        if let Some(total) = update.total_emails {
            model.total_emails = Set(total as i32);
        }
        if let Some(verified) = update.verified_emails {
            model.verified_emails = Set(verified as i32);
        }
        if let Some(at) = update.last_scraped_at {
            model.last_scraped_at = Set(Some(at));
        }

        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn update_session(
        &self,
        session_id: i32,
        update: SessionUpdate,
    ) -> Result<(), RepositoryError> {
        let mut model: session_entity::ActiveModel = session_entity::Entity::find_by_id(session_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into();

        model.status = Set(update.status.to_string());
        if let Some(found) = update.total_emails_found {
            model.total_emails_found = Set(found as i32);
        }
        if let Some(verified) = update.total_emails_verified {
            model.total_emails_verified = Set(verified as i32);
        }
        if let Some(at) = update.completed_at {
            model.completed_at = Set(Some(at));
        }

        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn add_email(&self, domain_id: i32, email: NewEmail) -> Result<i32, RepositoryError> {
        let existing = email_entity::Entity::find()
            .filter(email_entity::Column::DomainId.eq(domain_id))
            .filter(email_entity::Column::Email.eq(email.email.as_str()))
            .one(self.db.as_ref())
            .await?;

        if let Some(existing) = existing {
            let id = existing.id;
            let mut model: email_entity::ActiveModel = existing.into();
            model.confidence = Set(email.confidence as i32);
            model.is_valid = Set(email.is_valid);
            model.reason = Set(email.reason);
            model.source = Set(email.source.to_string());
            model.created_at = Set(Utc::now());
            model.update(self.db.as_ref()).await?;
            return Ok(id);
        }

        let model = email_entity::ActiveModel {
            domain_id: Set(domain_id),
            email: Set(email.email),
            confidence: Set(email.confidence as i32),
            is_valid: Set(email.is_valid),
            reason: Set(email.reason),
            source: Set(email.source.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.id)
    }

    async fn add_log(
        &self,
        domain_id: i32,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Result<(), RepositoryError> {
        let model = log_entity::ActiveModel {
            domain_id: Set(domain_id),
            timestamp: Set(timestamp),
            message: Set(message.to_string()),
            ..Default::default()
        };
        model.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn all_domains(&self) -> Result<Vec<DomainSummary>, RepositoryError> {
        let domains = domain_entity::Entity::find()
            .order_by_desc(domain_entity::Column::CreatedAt)
            .order_by_desc(domain_entity::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(domains.into_iter().map(to_domain_summary).collect())
    }

    async fn emails_by_domain(&self, domain: &str) -> Result<Vec<StoredEmail>, RepositoryError> {
        let Some(found) = self.find_domain(domain).await? else {
            return Ok(Vec::new());
        };
        let emails = email_entity::Entity::find()
            .filter(email_entity::Column::DomainId.eq(found.id))
            .order_by_desc(email_entity::Column::CreatedAt)
            .order_by_desc(email_entity::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(emails
            .into_iter()
            .map(|m| to_stored_email(m, found.domain.clone()))
            .collect())
    }

    async fn all_emails(&self) -> Result<Vec<StoredEmail>, RepositoryError> {
        let names = self.domain_names().await?;
        let emails = email_entity::Entity::find()
            .order_by_desc(email_entity::Column::CreatedAt)
            .order_by_desc(email_entity::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(emails
            .into_iter()
            .map(|m| {
                let domain = names.get(&m.domain_id).cloned().unwrap_or_default();
                to_stored_email(m, domain)
            })
            .collect())
    }

    async fn recent_logs(&self, limit: u64) -> Result<Vec<StoredLog>, RepositoryError> {
        let logs = log_entity::Entity::find()
            .order_by_desc(log_entity::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(logs.into_iter().map(to_stored_log).collect())
    }

    async fn logs_by_domain(&self, domain_id: i32) -> Result<Vec<StoredLog>, RepositoryError> {
        let logs = log_entity::Entity::find()
            .filter(log_entity::Column::DomainId.eq(domain_id))
            .order_by_asc(log_entity::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(logs.into_iter().map(to_stored_log).collect())
    }

    async fn recent_sessions(&self, limit: u64) -> Result<Vec<SessionSummary>, RepositoryError> {
        let names = self.domain_names().await?;
        let sessions = session_entity::Entity::find()
            .order_by_desc(session_entity::Column::StartedAt)
            .order_by_desc(session_entity::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(sessions
            .into_iter()
            .map(|m| {
                let domain = names.get(&m.domain_id).cloned().unwrap_or_default();
                to_session_summary(m, domain)
            })
            .collect())
    }

    async fn export_domain(&self, domain: &str) -> Result<Option<DomainExport>, RepositoryError> {
        let Some(found) = self.find_domain(domain).await? else {
            return Ok(None);
        };

        let emails = self.emails_by_domain(&found.domain).await?;
        let logs = self.logs_by_domain(found.id).await?;
        let sessions = session_entity::Entity::find()
            .filter(session_entity::Column::DomainId.eq(found.id))
            .order_by_desc(session_entity::Column::StartedAt)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|m| to_session_summary(m, found.domain.clone()))
            .collect();

        Ok(Some(DomainExport {
            domain: to_domain_summary(found),
            emails,
            sessions,
            logs,
        }))
    }

    async fn clear_all(&self) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        email_entity::Entity::delete_many().exec(&txn).await?;
        log_entity::Entity::delete_many().exec(&txn).await?;
        session_entity::Entity::delete_many().exec(&txn).await?;
        domain_entity::Entity::delete_many().exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete_low_confidence(&self, threshold: u8) -> Result<u64, RepositoryError> {
        let txn = self.db.begin().await?;

        let removed = email_entity::Entity::delete_many()
            .filter(email_entity::Column::Confidence.lt(threshold as i32))
            .exec(&txn)
            .await?
            .rows_affected;

        let with_emails: HashSet<i32> = email_entity::Entity::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|e| e.domain_id)
            .collect();
        let orphaned: Vec<i32> = domain_entity::Entity::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|d| d.id)
            .filter(|id| !with_emails.contains(id))
            .collect();

        if !orphaned.is_empty() {
            log_entity::Entity::delete_many()
                .filter(log_entity::Column::DomainId.is_in(orphaned.clone()))
                .exec(&txn)
                .await?;
            session_entity::Entity::delete_many()
                .filter(session_entity::Column::DomainId.is_in(orphaned.clone()))
                .exec(&txn)
                .await?;
            domain_entity::Entity::delete_many()
                .filter(domain_entity::Column::Id.is_in(orphaned))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(removed)
    }
}
