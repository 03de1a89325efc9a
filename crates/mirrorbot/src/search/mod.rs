//! Search-side building blocks of a discovery cycle.
//!
//! - [`build_queries`] expands keywords and languages into query strings.
//! - [`Fetcher`] runs one rate-limited page request against a [`SearchClient`].
//! - [`RetentionPolicy`] decides which candidates are worth mirroring.
//! - [`TargetMode`] picks the URL that goes onto the work queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::HttpError;

mod fetch;
mod filter;
mod query;
mod target;

pub use fetch::{FetchError, Fetcher, MAX_PAGES, PER_PAGE, page_limit};
pub use filter::{DAYS_PER_MONTH, RetentionPolicy};
pub use query::build_queries;
pub use target::{CloneProtocol, TargetMode};

/// A repository returned by a search call, before filtering or dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRepo {
    /// `owner/name`.
    pub full_name: String,
    pub ssh_url: String,
    pub clone_url: String,
    /// Web page of the repository, also the fork target.
    pub html_url: String,
    pub stars: u32,
    /// Last push; `None` when the repository has never been pushed to.
    pub pushed_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub description: Option<String>,
}

/// Errors from a single search call. Each one aborts only the current query.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("authentication required (check the GitHub token)")]
    AuthRequired,

    #[error("search rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("invalid search URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A paginated repository search API.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetch one page (1-indexed) of results for `query`.
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<CandidateRepo>, SearchError>;
}
