//! Per-repository results of one cycle.

use std::fmt;
use std::time::Duration;

use crate::search::CandidateRepo;

/// Shown when a repository has no description.
pub const NO_DESCRIPTION: &str = "No description available";

/// Which step of the decision sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    DedupCheck,
    Enqueue,
    Mark,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::DedupCheck => write!(f, "dedup check"),
            FailureStage::Enqueue => write!(f, "enqueue"),
            FailureStage::Mark => write!(f, "mark"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Queued,
    Failed { stage: FailureStage, error: String },
}

/// One repository that reached the dedup check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub full_name: String,
    pub description: String,
    pub stars: u32,
    pub language: Option<String>,
    /// The job payload (clone URL or fork page).
    pub target: String,
    pub html_url: String,
    pub status: OutcomeStatus,
}

impl CycleOutcome {
    pub fn new(repo: &CandidateRepo, target: &str, status: OutcomeStatus) -> Self {
        Self {
            full_name: repo.full_name.clone(),
            description: clean_description(repo.description.as_deref()),
            stars: repo.stars,
            language: repo.language.clone(),
            target: target.to_string(),
            html_url: repo.html_url.clone(),
            status,
        }
    }

    pub fn is_queued(&self) -> bool {
        self.status == OutcomeStatus::Queued
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Queued => None,
            OutcomeStatus::Failed { error, .. } => Some(error),
        }
    }
}

/// A query that was abandoned because a search call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    pub query: String,
    pub page: u32,
    pub error: String,
}

/// Everything one cycle did, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Number of planned queries.
    pub queries: usize,
    /// Candidates returned by the search API before filtering.
    pub candidates: usize,
    pub outcomes: Vec<CycleOutcome>,
    pub query_errors: Vec<QueryError>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn queued(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_queued()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.queued()
    }
}

/// Collapse whitespace runs (newlines, tabs) to single spaces.
pub fn clean_description(description: Option<&str>) -> String {
    let cleaned = description
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        cleaned
    }
}
