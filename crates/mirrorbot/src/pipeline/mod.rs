//! The discovery cycle.
//!
//! [`Pipeline::run`] drives one cycle: plan queries, fetch pages under the
//! rate limit, and run every candidate through the decision sequence
//!
//! 1. retention filter (silent reject)
//! 2. dedup check (error: record and move on; seen: skip)
//! 3. target resolution
//! 4. enqueue (error: record, do not mark)
//! 5. mark (error: record; the job is already queued)
//!
//! Enqueue always happens before mark. A crash in between leaves the
//! repository unmarked, so a later cycle finds it again and re-enqueues it;
//! the mirroring worker is expected to be idempotent on the target URL.
//!
//! Queries, pages and repositories are processed one at a time in API order.
//! Cancellation is checked before every query and page and races every
//! suspension point; a cancelled cycle returns [`PipelineError::Cancelled`]
//! without rolling back jobs already queued.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;

use crate::context::{Cancelled, CycleContext};
use crate::notify::{Notifier, NotifyError};
use crate::search::{
    CandidateRepo, FetchError, Fetcher, RetentionPolicy, TargetMode, build_queries,
};
use crate::short_error_message;
use crate::store::{DedupStore, WorkQueue};

mod outcome;
mod progress;

#[cfg(test)]
mod tests;

pub use outcome::{
    CycleOutcome, CycleReport, FailureStage, NO_DESCRIPTION, OutcomeStatus, QueryError,
    clean_description,
};
pub use progress::{CycleProgress, ProgressCallback, emit};

/// Terminal error of a cycle. Everything else is recorded in the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// What a cycle searches for and how it treats the results.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub keywords: Vec<String>,
    pub languages: Vec<String>,
    pub target: TargetMode,
    pub retention: RetentionPolicy,
    /// Send one summary at the end instead of a message per repository.
    pub batch_summary: bool,
}

impl PipelineOptions {
    pub fn queries(&self) -> Vec<String> {
        build_queries(&self.keywords, &self.languages)
    }
}

pub struct Pipeline {
    fetcher: Fetcher,
    dedup: Arc<dyn DedupStore>,
    queue: Arc<dyn WorkQueue>,
    notifier: Option<Arc<dyn Notifier>>,
    options: PipelineOptions,
    on_progress: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn new(
        fetcher: Fetcher,
        dedup: Arc<dyn DedupStore>,
        queue: Arc<dyn WorkQueue>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            dedup,
            queue,
            notifier: None,
            options,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn emit(&self, event: CycleProgress) {
        emit(self.on_progress.as_ref(), event);
    }

    /// Run one full cycle.
    ///
    /// Search failures abort only their query and store failures only their
    /// repository; both end up in the returned report. The only error is
    /// cancellation.
    pub async fn run(&self, ctx: &CycleContext) -> Result<CycleReport, PipelineError> {
        let started = Instant::now();
        let now = Utc::now();
        let queries = self.options.queries();
        let total = queries.len();

        let mut report = CycleReport {
            queries: total,
            ..CycleReport::default()
        };
        self.emit(CycleProgress::CycleStarted { queries: total });

        for (index, query) in queries.iter().enumerate() {
            ctx.check()?;
            self.emit(CycleProgress::QueryStarted {
                index,
                total,
                query: query.clone(),
            });

            match self.run_query(ctx, query, now, &mut report).await {
                Ok(candidates) => self.emit(CycleProgress::QueryFinished {
                    index,
                    query: query.clone(),
                    candidates,
                }),
                Err((_, FetchError::Cancelled(cancelled))) => return Err(cancelled.into()),
                Err((page, FetchError::Search(err))) => {
                    let error = short_error_message(&err);
                    tracing::warn!(query = %query, page, error = %error, "Query aborted");
                    self.emit(CycleProgress::QueryFailed {
                        query: query.clone(),
                        page,
                        error: error.clone(),
                    });
                    report.query_errors.push(QueryError {
                        query: query.clone(),
                        page,
                        error,
                    });
                }
            }
        }

        report.elapsed = started.elapsed();

        if self.options.batch_summary
            && let Some(notifier) = &self.notifier
        {
            let result = notifier.notify_summary(ctx, &report).await;
            self.handle_notify_result(result)?;
        }

        self.emit(CycleProgress::CycleComplete {
            queued: report.queued(),
            failed: report.failed(),
            query_errors: report.query_errors.len(),
            elapsed: report.elapsed,
        });
        Ok(report)
    }

    /// Page through one query. On error, returns the page that failed.
    async fn run_query(
        &self,
        ctx: &CycleContext,
        query: &str,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<usize, (u32, FetchError)> {
        let mut candidates = 0;

        for page in 1..=self.fetcher.max_pages() {
            ctx.check().map_err(|c| (page, c.into()))?;

            let repos = self
                .fetcher
                .fetch_page(ctx, query, page)
                .await
                .map_err(|e| (page, e))?;
            self.emit(CycleProgress::PageFetched {
                query: query.to_string(),
                page,
                count: repos.len(),
            });

            if repos.is_empty() {
                break;
            }
            candidates += repos.len();
            report.candidates += repos.len();

            for repo in &repos {
                let outcome = self
                    .process_repo(ctx, repo, now)
                    .await
                    .map_err(|c| (page, c.into()))?;
                if let Some(outcome) = outcome {
                    report.outcomes.push(outcome);
                }
            }
        }

        Ok(candidates)
    }

    /// The per-repository decision sequence. `None` means filtered or
    /// already seen.
    async fn process_repo(
        &self,
        ctx: &CycleContext,
        repo: &CandidateRepo,
        now: DateTime<Utc>,
    ) -> Result<Option<CycleOutcome>, Cancelled> {
        if !self.options.retention.keeps(repo, now) {
            tracing::trace!(repo = %repo.full_name, stars = repo.stars, "Filtered out");
            return Ok(None);
        }

        match ctx.run(self.dedup.seen(&repo.full_name)).await? {
            Ok(true) => {
                self.emit(CycleProgress::RepoSkipped {
                    full_name: repo.full_name.clone(),
                });
                return Ok(None);
            }
            Ok(false) => {}
            Err(err) => {
                let target = self.options.target.resolve(repo);
                let outcome = self.failed(repo, target, FailureStage::DedupCheck, &err);
                return self.finish(ctx, outcome).await.map(Some);
            }
        }

        let target = self.options.target.resolve(repo);

        if let Err(err) = ctx.run(self.queue.enqueue(target)).await? {
            let outcome = self.failed(repo, target, FailureStage::Enqueue, &err);
            return self.finish(ctx, outcome).await.map(Some);
        }

        if let Err(err) = ctx.run(self.dedup.mark(&repo.full_name)).await? {
            let outcome = self.failed(repo, target, FailureStage::Mark, &err);
            return self.finish(ctx, outcome).await.map(Some);
        }

        tracing::info!(repo = %repo.full_name, target = %target, "Queued repository");
        self.emit(CycleProgress::RepoQueued {
            full_name: repo.full_name.clone(),
            target: target.to_string(),
        });
        let outcome = CycleOutcome::new(repo, target, OutcomeStatus::Queued);
        self.finish(ctx, outcome).await.map(Some)
    }

    fn failed(
        &self,
        repo: &CandidateRepo,
        target: &str,
        stage: FailureStage,
        err: &impl std::error::Error,
    ) -> CycleOutcome {
        let error = short_error_message(err);
        tracing::warn!(repo = %repo.full_name, %stage, error = %error, "Repository failed");
        self.emit(CycleProgress::RepoFailed {
            full_name: repo.full_name.clone(),
            stage,
            error: error.clone(),
        });
        CycleOutcome::new(repo, target, OutcomeStatus::Failed { stage, error })
    }

    /// Send the per-repository notification when batching is off.
    async fn finish(
        &self,
        ctx: &CycleContext,
        outcome: CycleOutcome,
    ) -> Result<CycleOutcome, Cancelled> {
        if !self.options.batch_summary
            && let Some(notifier) = &self.notifier
        {
            let result = notifier.notify_repo(ctx, &outcome).await;
            self.handle_notify_result(result)?;
        }
        Ok(outcome)
    }

    /// Notification failures are reported, never fatal. Cancellation is.
    fn handle_notify_result(&self, result: Result<(), NotifyError>) -> Result<(), Cancelled> {
        match result {
            Ok(()) => Ok(()),
            Err(NotifyError::Cancelled(cancelled)) => Err(cancelled),
            Err(err) => {
                let error = short_error_message(&err);
                tracing::error!(error = %error, "Notification failed");
                self.emit(CycleProgress::NotificationFailed { error });
                Ok(())
            }
        }
    }
}
