//! Wire types for `GET /search/repositories`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::search::CandidateRepo;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub full_name: String,
    pub ssh_url: String,
    pub clone_url: String,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u32,
    pub pushed_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub description: Option<String>,
}

impl From<SearchItem> for CandidateRepo {
    fn from(item: SearchItem) -> Self {
        CandidateRepo {
            full_name: item.full_name,
            ssh_url: item.ssh_url,
            clone_url: item.clone_url,
            html_url: item.html_url,
            stars: item.stargazers_count,
            pushed_at: item.pushed_at,
            language: item.language,
            description: item.description,
        }
    }
}
