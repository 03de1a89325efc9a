//! Mirrorbot - rate-limited repository discovery and mirror-job dispatch.
//!
//! One discovery *cycle* expands the configured keywords and languages into
//! GitHub search queries, pages through the results under a token-bucket rate
//! limit, keeps repositories that are recently active or popular enough, skips
//! the ones already processed, and pushes the rest onto a durable work queue
//! for an external mirroring worker. Outcomes can be reported to a Discord
//! webhook, one message per repository or as a single batched summary.
//!
//! # Features
//!
//! - `sqlite` (default) / `postgres` - database backend for the dedup store
//!   and work queue.
//! - `migrate` (default) - Enables database migration support. When enabled,
//!   you can use [`connect_and_migrate`] to create the schema on connection.
//!
//! # Example
//!
//! ```ignore
//! use mirrorbot::{connect_and_migrate, CycleContext, Pipeline};
//!
//! let db = connect_and_migrate("sqlite://mirrorbot.db?mode=rwc").await?;
//! let store = Arc::new(SqlStore::new(db));
//!
//! let pipeline = Pipeline::new(fetcher, store.clone(), store, options);
//! let report = pipeline.run(&CycleContext::new(token)).await?;
//! println!("queued {} repositories", report.queued());
//! ```

pub mod context;
pub mod db;
pub mod entity;
pub mod github;
pub mod http;
pub mod notify;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
pub mod search;
pub mod store;

#[cfg(feature = "migrate")]
pub mod migration;

#[cfg(test)]
mod test_support;

pub use context::{CancelCause, Cancelled, CycleContext};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use github::GitHubSearchClient;
pub use notify::{DiscordNotifier, Notifier, NotifyError};
pub use pipeline::{
    CycleOutcome, CycleProgress, CycleReport, Pipeline, PipelineError, PipelineOptions,
};
pub use rate_limit::TokenBucket;
pub use search::{CandidateRepo, Fetcher, RetentionPolicy, SearchClient, SearchError, TargetMode};
pub use store::{DedupStore, SqlStore, StoreError, WorkQueue};

/// Extract a short, single-line error message from an error.
///
/// Outcome records and progress events carry this form so that multi-line
/// error bodies never leak into notifications.
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_error_message_keeps_first_line() {
        let err = SearchError::UnexpectedStatus {
            status: 502,
            message: "bad gateway\n<html>...</html>".to_string(),
        };
        assert_eq!(short_error_message(&err), "unexpected status 502: bad gateway");
    }
}
