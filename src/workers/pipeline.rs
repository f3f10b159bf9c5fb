// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::settings::{PipelineSettings, Settings};
use crate::domain::models::email::{EmailSource, PageResult, Verdict, VerificationRecord};
use crate::domain::models::log_entry::{LogEntry, LogLevel};
use crate::domain::models::report::ScrapeReport;
use crate::domain::models::session::{Session, SessionStatus};
use crate::domain::repositories::scrape_repository::{
    DomainUpdate, NewEmail, RepositoryError, ScrapeRepository, SessionUpdate,
};
use crate::domain::services::crawl_service::CrawlService;
use crate::domain::services::extraction_service::ExtractionService;
use crate::domain::services::verification_service::VerificationService;
use crate::infrastructure::metrics;
use crate::utils::errors::PipelineError;
use crate::utils::url_utils::{normalize_domain, seed_url};
use crate::workers::session_state::{SessionState, SessionTicket};
use crate::workers::task_group::{panic_message, TaskGroup};

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub accepted: bool,
    pub message: String,
}

/// 状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: SessionStatus,
    pub results_count: usize,
}

/// 跨页面聚合的候选邮箱集合
///
/// 同一地址既被发现又被生成时按"发现"处理。
/// 同时保留每个发现地址出现过的页面，页面列表有序且去重。
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    found: BTreeSet<String>,
    generated: BTreeSet<String>,
    sources: BTreeMap<String, Vec<String>>,
}

impl CandidateSet {
    pub fn merge(&mut self, page: PageResult) {
        self.found.extend(page.found);
        self.generated.extend(page.generated);
        for (email, urls) in page.sources {
            let pages = self.sources.entry(email).or_default();
            pages.extend(urls);
            pages.sort();
            pages.dedup();
        }
    }

    /// 发现该地址的页面
    pub fn pages(&self, email: &str) -> &[String] {
        self.sources.get(email).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 取出来源映射，候选集合本身保持不变
    pub fn take_sources(&mut self) -> BTreeMap<String, Vec<String>> {
        std::mem::take(&mut self.sources)
    }

    /// 去重后的候选数
    pub fn len(&self) -> usize {
        self.found.len() + self.generated.difference(&self.found).count()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty() && self.generated.is_empty()
    }

    /// 展开为有序候选列表，发现的地址在前，总数不超过 `limit`
    pub fn into_candidates(self, limit: usize) -> Vec<(String, EmailSource)> {
        let CandidateSet {
            found, generated, ..
        } = self;
        let generated: Vec<String> = generated
            .into_iter()
            .filter(|email| !found.contains(email))
            .collect();

        found
            .into_iter()
            .map(|email| (email, EmailSource::Found))
            .chain(generated.into_iter().map(|email| (email, EmailSource::Generated)))
            .take(limit)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionTotals {
    found: usize,
    verified: usize,
}

/// 抓取流水线
///
/// 持有唯一的会话状态，按顺序驱动三个阶段：
/// 爬取发现页面、有界并发地提取邮箱、有界并发地验证候选。
/// 停止请求在每个任务完成后检查。
pub struct ScrapePipeline {
    state: Arc<SessionState>,
    crawler: Arc<CrawlService>,
    extractor: Arc<ExtractionService>,
    verifier: Arc<VerificationService>,
    repository: Arc<dyn ScrapeRepository>,
    settings: PipelineSettings,
    /// 单页处理的超时保护
    page_budget: Duration,
    /// 单个验证的超时保护
    verify_budget: Duration,
    running: Mutex<Option<JoinHandle<()>>>,
}

impl ScrapePipeline {
    /// 创建新的流水线
    ///
    /// # 参数
    ///
    /// * `crawler` - 爬取服务
    /// * `extractor` - 提取服务
    /// * `verifier` - 验证服务
    /// * `repository` - 持久化仓库
    /// * `settings` - 全局配置，用于派生并发上限和超时预算
    pub fn new(
        crawler: Arc<CrawlService>,
        extractor: Arc<ExtractionService>,
        verifier: Arc<VerificationService>,
        repository: Arc<dyn ScrapeRepository>,
        settings: &Settings,
    ) -> Self {
        let attempts = settings.crawler.attempts();
        let page_budget = (settings.crawler.fetch_timeout() + settings.crawler.gate_interval())
            * attempts
            + Duration::from_secs(10);
        let verify_budget = settings.verifier.verification_timeout() + Duration::from_secs(2);

        Self {
            state: Arc::new(SessionState::new()),
            crawler,
            extractor,
            verifier,
            repository,
            settings: settings.pipeline.clone(),
            page_budget,
            verify_budget,
            running: Mutex::new(None),
        }
    }

    /// 提交抓取请求
    ///
    /// 仅在空闲时接受；会话在后台任务中运行
    pub fn submit(self: &Arc<Self>, domain: &str) -> SubmitOutcome {
        match self.try_submit(domain) {
            Ok(message) => SubmitOutcome {
                accepted: true,
                message,
            },
            Err(e) => SubmitOutcome {
                accepted: false,
                message: e.to_string(),
            },
        }
    }

    /// 与 [`submit`](Self::submit) 相同，但返回具体的拒绝原因
    pub fn try_submit(self: &Arc<Self>, input: &str) -> Result<String, PipelineError> {
        let domain = normalize_domain(input);
        if domain.is_empty() {
            return Err(PipelineError::InvalidDomain);
        }
        // Crawl the host as typed; the normalized form names the session and the generated addresses
        let seed = seed_url(input);
        let ticket = self.state.try_begin(&domain)?;

        let message = format!("Started scraping {}", domain);
        let pipeline = Arc::clone(self);
        let handle =
            tokio::spawn(async move { pipeline.run_session(ticket, domain, seed).await });
        *self.running.lock() = Some(handle);
        Ok(message)
    }

    /// 请求停止；不在抓取中时返回 false
    pub fn request_stop(&self) -> bool {
        self.state.request_stop()
    }

    /// 等待当前会话任务结束（不含冷却）
    pub async fn join(&self) {
        let handle = self.running.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.state.status(),
            results_count: self.state.result_count(),
        }
    }

    /// 当前会话日志（按发出顺序）
    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.logs()
    }

    /// 当前会话结果（按时间倒序）
    pub fn results(&self) -> Vec<VerificationRecord> {
        self.state.results()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.session()
    }

    /// 当前或最近一次会话的报告
    pub fn report(&self) -> Option<ScrapeReport> {
        let session = self.state.session()?;
        let records = self.state.results();
        let total = session.total_emails_found.max(records.len());
        Some(ScrapeReport::new(session.domain, session.status, records, total))
    }

    /// 清空内存中的会话日志与结果，抓取中时拒绝
    pub fn clear(&self) -> Result<(), PipelineError> {
        self.state.clear()
    }

    async fn run_session(self: Arc<Self>, ticket: SessionTicket, domain: String, seed: String) {
        let started = Instant::now();
        let generation = ticket.generation;

        let outcome = AssertUnwindSafe(self.execute(&ticket, &domain, &seed))
            .catch_unwind()
            .await;

        let (status, totals, level, closing_line) = match outcome {
            Ok(Ok(totals)) => (
                SessionStatus::Completed,
                totals,
                LogLevel::Complete,
                format!("Scraping completed! Found {} emails.", totals.found),
            ),
            Ok(Err(e)) if e.is_cancellation() => (
                SessionStatus::Stopped,
                self.partial_totals(),
                LogLevel::Stop,
                e.to_string(),
            ),
            Ok(Err(e)) => (
                SessionStatus::Error,
                self.partial_totals(),
                LogLevel::Error,
                e.to_string(),
            ),
            Err(payload) => {
                let failure = PipelineError::UnexpectedFailure(panic_message(payload));
                (
                    SessionStatus::Error,
                    self.partial_totals(),
                    LogLevel::Error,
                    failure.to_string(),
                )
            }
        };

        // Persist first so every log line lands before the session leaves scraping
        let closing = self
            .state
            .closing(generation, status, totals.found, totals.verified);
        if let Some(session) = &closing {
            self.persist_outcome(generation, session).await;
        }
        self.log(generation, level, &closing_line).await;
        if let Some(session) = closing {
            self.state.finish_with(generation, session);
        }

        metrics::record_session(status, started.elapsed());
        self.schedule_reset(generation);
    }

    async fn execute(
        self: &Arc<Self>,
        ticket: &SessionTicket,
        domain: &str,
        seed: &str,
    ) -> Result<SessionTotals, PipelineError> {
        let generation = ticket.generation;
        let registered = self.register(generation, domain).await;

        self.log(generation, LogLevel::Info, &format!("Starting scraping for {}", domain))
            .await;
        if let Err(e) = registered {
            self.log(
                generation,
                LogLevel::Warning,
                &format!("Failed to record session for {}: {}", domain, e),
            )
            .await;
        }
        if self.crawler.bypasses_robots() {
            self.log(generation, LogLevel::Warning, "Bypassing robots.txt restrictions")
                .await;
        }

        self.log(generation, LogLevel::Info, &format!("Crawling website: {}", seed))
            .await;
        let urls = self.crawler.crawl(seed, &ticket.cancel).await;
        if ticket.cancel.is_cancelled() {
            return Err(PipelineError::UserCancelled);
        }
        if urls.is_empty() {
            return Err(PipelineError::NoUrlsDiscovered(domain.to_string()));
        }
        self.log(
            generation,
            LogLevel::Success,
            &format!("Found {} URLs to process", urls.len()),
        )
        .await;

        let mut candidates = self.extract_all(ticket, domain, urls).await?;
        self.log(
            generation,
            LogLevel::Stats,
            &format!("Total unique emails: {}", candidates.len()),
        )
        .await;
        if candidates.is_empty() {
            return Err(PipelineError::NoCandidatesFound(domain.to_string()));
        }

        let sources = candidates.take_sources();
        let candidates = candidates.into_candidates(self.settings.max_total_emails);
        self.log(
            generation,
            LogLevel::Search,
            &format!("Verifying {} emails concurrently...", candidates.len()),
        )
        .await;
        self.verify_all(ticket, domain, candidates, &sources).await
    }

    /// 页面阶段：并发数为 min(配置, 页面数)
    async fn extract_all(
        self: &Arc<Self>,
        ticket: &SessionTicket,
        domain: &str,
        urls: Vec<String>,
    ) -> Result<CandidateSet, PipelineError> {
        let generation = ticket.generation;
        let workers = self.settings.page_worker_concurrency.min(urls.len());
        self.log(
            generation,
            LogLevel::Info,
            &format!("Extracting emails from {} pages concurrently...", urls.len()),
        )
        .await;

        let mut group = TaskGroup::new(workers);
        for url in urls {
            let pipeline = Arc::clone(self);
            let domain = domain.to_string();
            group.push(url.clone(), async move {
                pipeline.process_page(generation, &domain, &url).await
            });
        }

        let mut candidates = CandidateSet::default();
        while let Some((url, outcome)) = group.next().await {
            match outcome {
                Ok(page) => candidates.merge(page),
                Err(failure) => {
                    self.log(
                        generation,
                        LogLevel::Error,
                        &format!("Error processing {}: {}", url, failure),
                    )
                    .await;
                }
            }
            if ticket.cancel.is_cancelled() {
                group.abort_all();
                return Err(PipelineError::UserCancelled);
            }
        }
        Ok(candidates)
    }

    async fn process_page(&self, generation: u64, domain: &str, url: &str) -> PageResult {
        self.log(generation, LogLevel::Page, &format!("Processing: {}", url))
            .await;

        let content = match self.guarded(self.page_budget, self.crawler.fetch_content(url)).await {
            Some(Some(content)) if !content.trim().is_empty() => content,
            Some(_) => {
                metrics::record_page(false);
                self.log(
                    generation,
                    LogLevel::Warning,
                    &format!("No content found for {}", url),
                )
                .await;
                return PageResult::empty(url);
            }
            None => {
                metrics::record_page(false);
                self.log(
                    generation,
                    LogLevel::Warning,
                    &format!("Timed out fetching {}", url),
                )
                .await;
                return PageResult::empty(url);
            }
        };

        let page = self.extractor.extract_page(url, &content, domain);
        metrics::record_page(true);
        self.log(
            generation,
            LogLevel::Email,
            &format!(
                "Found {} emails, generated {} emails from {}",
                page.found.len(),
                page.generated.len(),
                url
            ),
        )
        .await;
        page
    }

    /// 验证阶段：并发数为 min(配置, 候选数)
    async fn verify_all(
        self: &Arc<Self>,
        ticket: &SessionTicket,
        domain: &str,
        candidates: Vec<(String, EmailSource)>,
        sources: &BTreeMap<String, Vec<String>>,
    ) -> Result<SessionTotals, PipelineError> {
        let generation = ticket.generation;
        let total = candidates.len();
        let mut group = TaskGroup::new(self.settings.verify_worker_concurrency.min(total));
        for (email, source) in candidates {
            let pipeline = Arc::clone(self);
            group.push((email.clone(), source), async move {
                pipeline.verify_one(&email, source).await
            });
        }

        let mut completed = 0;
        while let Some(((email, source), outcome)) = group.next().await {
            if ticket.cancel.is_cancelled() {
                group.abort_all();
                return Err(PipelineError::UserCancelled);
            }

            let verdict = match outcome {
                Ok(verdict) => verdict,
                Err(failure) => {
                    self.log(
                        generation,
                        LogLevel::Error,
                        &format!("Error verifying {}: {}", email, failure),
                    )
                    .await;
                    continue;
                }
            };

            let pages = sources.get(&email).cloned().unwrap_or_default();
            if !pages.is_empty() {
                debug!("{} found on {}", email, pages.join(", "));
            }
            let record = VerificationRecord::new(&email, domain, source, verdict).with_pages(pages);
            let Some(index) = self.state.push_result(generation, record.clone()) else {
                group.abort_all();
                return Err(PipelineError::UserCancelled);
            };
            metrics::record_verification(record.is_valid);
            self.persist_email(generation, index, &record).await;

            completed += 1;
            self.log(
                generation,
                LogLevel::Success,
                &format!(
                    "Completed {}/{}: {} (confidence: {}%)",
                    completed, total, email, record.confidence
                ),
            )
            .await;
        }

        // Candidates skipped by a failed worker still count towards the total
        Ok(SessionTotals {
            found: total,
            verified: self.partial_totals().verified,
        })
    }

    async fn verify_one(&self, email: &str, source: EmailSource) -> Verdict {
        self.guarded(self.verify_budget, self.verifier.verify(email, source))
            .await
            .unwrap_or_else(|| Verdict::new(false, 15, "Verification timed out"))
    }

    /// 超时保护开启时限制单个工作单元的耗时
    async fn guarded<F: Future>(&self, budget: Duration, work: F) -> Option<F::Output> {
        if self.settings.timeout_protection_enabled {
            tokio::time::timeout(budget, work).await.ok()
        } else {
            Some(work.await)
        }
    }

    fn partial_totals(&self) -> SessionTotals {
        let results = self.state.results();
        SessionTotals {
            found: results.len(),
            verified: results.iter().filter(|r| r.is_valid).count(),
        }
    }

    /// 追加日志行并写入持久化层
    ///
    /// 日志行的持久化失败只输出 tracing 警告，避免递归写日志
    async fn log(&self, generation: u64, level: LogLevel, text: &str) {
        let Some(entry) = self.state.append_log(generation, level, text) else {
            return;
        };
        let Some(domain_id) = self.state.domain_id(generation) else {
            return;
        };
        if let Err(e) = self
            .repository
            .add_log(domain_id, entry.timestamp, &entry.message)
            .await
        {
            warn!("Failed to persist log line: {}", e);
        }
    }

    async fn register(&self, generation: u64, domain: &str) -> Result<(), RepositoryError> {
        let domain_id = self
            .repository
            .add_domain(domain, SessionStatus::Scraping)
            .await?;
        self.state.attach_ids(generation, Some(domain_id), None);
        let session_id = self.repository.start_session(domain_id).await?;
        self.state
            .attach_ids(generation, Some(domain_id), Some(session_id));
        Ok(())
    }

    async fn persist_email(&self, generation: u64, index: usize, record: &VerificationRecord) {
        let Some(domain_id) = self.state.domain_id(generation) else {
            return;
        };
        let email = NewEmail {
            email: record.email.clone(),
            confidence: record.confidence,
            is_valid: record.is_valid,
            reason: record.reason.clone(),
            source: record.source,
        };
        match self.repository.add_email(domain_id, email).await {
            Ok(id) => self.state.set_result_id(generation, index, id),
            Err(e) => {
                self.log(
                    generation,
                    LogLevel::Warning,
                    &format!("Failed to save {}: {}", record.email, e),
                )
                .await;
            }
        }
    }

    async fn persist_outcome(&self, generation: u64, session: &Session) {
        let Some(domain_id) = session.domain_id else {
            return;
        };

        let domain_update = DomainUpdate {
            status: session.status,
            total_emails: Some(session.total_emails_found),
            verified_emails: Some(session.total_emails_verified),
            last_scraped_at: session.completed_at,
        };
        if let Err(e) = self
            .repository
            .update_domain_status(domain_id, domain_update)
            .await
        {
            self.log(
                generation,
                LogLevel::Warning,
                &format!("Failed to update domain {}: {}", session.domain, e),
            )
            .await;
        }

        let Some(session_id) = session.session_id else {
            return;
        };
        let session_update = SessionUpdate {
            status: session.status,
            total_emails_found: Some(session.total_emails_found),
            total_emails_verified: Some(session.total_emails_verified),
            completed_at: session.completed_at,
        };
        if let Err(e) = self
            .repository
            .update_session(session_id, session_update)
            .await
        {
            self.log(
                generation,
                LogLevel::Warning,
                &format!("Failed to update session for {}: {}", session.domain, e),
            )
            .await;
        }
    }

    /// 冷却结束后回到空闲，期间若已开始新会话则不做任何事
    fn schedule_reset(&self, generation: u64) {
        let state = Arc::clone(&self.state);
        let cooldown = self.settings.cooldown();
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            if state.reset_to_idle(generation) {
                debug!("Session {} reset to idle", generation);
            }
        });
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
