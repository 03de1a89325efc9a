//! GitHub search client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::SearchResponse;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::search::{CandidateRepo, PER_PAGE, SearchClient, SearchError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Most recently updated results first, so new activity surfaces early.
pub const DEFAULT_SORT: &str = "updated";

const USER_AGENT: &str = concat!("mirrorbot/", env!("CARGO_PKG_VERSION"));

/// Build the search URL for one page of `query`.
pub fn search_url(
    api_url: &str,
    query: &str,
    sort: &str,
    page: u32,
) -> Result<String, SearchError> {
    let base = format!("{}/search/repositories", api_url.trim_end_matches('/'));
    let per_page = PER_PAGE.to_string();
    let page = page.to_string();
    let url = url::Url::parse_with_params(
        &base,
        &[
            ("q", query),
            ("sort", sort),
            ("per_page", per_page.as_str()),
            ("page", page.as_str()),
        ],
    )?;
    Ok(url.into())
}

/// `GET /search/repositories` with bearer-token auth.
pub struct GitHubSearchClient {
    transport: Arc<dyn HttpTransport>,
    token: String,
    api_url: String,
    sort: String,
}

impl GitHubSearchClient {
    pub fn new(transport: Arc<dyn HttpTransport>, token: impl Into<String>) -> Self {
        Self {
            transport,
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            sort: DEFAULT_SORT.to_string(),
        }
    }

    /// Point the client at a different API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Map a non-200 response to an error.
    fn status_error(response: &HttpResponse) -> SearchError {
        match response.status {
            401 => SearchError::AuthRequired,
            403 | 429 if response.header("x-ratelimit-remaining") == Some("0") => {
                SearchError::RateLimited {
                    reset_at: parse_reset(response).unwrap_or_else(Utc::now),
                }
            }
            status => SearchError::UnexpectedStatus {
                status,
                message: response.body_text(),
            },
        }
    }
}

/// Read `x-ratelimit-reset` (unix seconds).
fn parse_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    let epoch = response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())?;
    DateTime::from_timestamp(epoch, 0)
}

#[async_trait]
impl SearchClient for GitHubSearchClient {
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<CandidateRepo>, SearchError> {
        let url = search_url(&self.api_url, query, &self.sort, page)?;
        let request = HttpRequest::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("Bearer {}", self.token));

        let response = self.transport.send(request).await?;
        if response.status != 200 {
            let err = Self::status_error(&response);
            tracing::warn!(query = %query, page, status = response.status, "Search request failed");
            return Err(err);
        }

        let parsed: SearchResponse = serde_json::from_slice(&response.body)?;
        if parsed.incomplete_results {
            tracing::debug!(query = %query, page, "Search returned incomplete results");
        }
        Ok(parsed.items.into_iter().map(CandidateRepo::from).collect())
    }
}
