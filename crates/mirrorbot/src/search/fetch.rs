//! Rate-limited page fetches.

use std::sync::Arc;

use thiserror::Error;

use super::{CandidateRepo, SearchClient, SearchError};
use crate::context::{Cancelled, CycleContext};
use crate::rate_limit::TokenBucket;

/// Results requested per page (the search API maximum).
pub const PER_PAGE: u32 = 100;

/// The search API never returns more than 1000 results per query.
pub const MAX_PAGES: u32 = 10;

/// Pages to request for a query that should yield up to `max_repos` results.
pub fn page_limit(max_repos: u32) -> u32 {
    max_repos.div_ceil(PER_PAGE).min(MAX_PAGES)
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Runs search calls through a shared [`TokenBucket`].
pub struct Fetcher {
    client: Arc<dyn SearchClient>,
    limiter: Arc<TokenBucket>,
    max_pages: u32,
}

impl Fetcher {
    pub fn new(
        client: Arc<dyn SearchClient>,
        limiter: Arc<TokenBucket>,
        max_repos_per_query: u32,
    ) -> Self {
        Self {
            client,
            limiter,
            max_pages: page_limit(max_repos_per_query),
        }
    }

    /// Highest page number requested for any query.
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn limiter(&self) -> &TokenBucket {
        &self.limiter
    }

    /// Take a rate token, then fetch `page` of `query`.
    pub async fn fetch_page(
        &self,
        ctx: &CycleContext,
        query: &str,
        page: u32,
    ) -> Result<Vec<CandidateRepo>, FetchError> {
        self.limiter.take(ctx).await?;
        let repos = ctx
            .run(self.client.search_repositories(query, page))
            .await??;
        tracing::debug!(query = %query, page, count = repos.len(), "Fetched search page");
        Ok(repos)
    }
}
