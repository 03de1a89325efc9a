//! GitHub repository search over the REST API.

mod client;
mod types;

pub use client::{DEFAULT_API_URL, DEFAULT_SORT, GitHubSearchClient, search_url};
pub use types::{SearchItem, SearchResponse};
