//! In-memory fakes shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::context::CycleContext;
use crate::notify::{Notifier, NotifyError};
use crate::pipeline::{CycleOutcome, CycleReport};
use crate::search::{CandidateRepo, SearchClient, SearchError};
use crate::store::{DedupStore, StoreError, WorkQueue};

/// A repository pushed yesterday.
pub fn candidate(full_name: &str, stars: u32) -> CandidateRepo {
    CandidateRepo {
        full_name: full_name.to_string(),
        ssh_url: format!("git@github.com:{full_name}.git"),
        clone_url: format!("https://github.com/{full_name}.git"),
        html_url: format!("https://github.com/{full_name}"),
        stars,
        pushed_at: Some(Utc::now() - Duration::days(1)),
        language: Some("Rust".to_string()),
        description: Some(format!("About {full_name}")),
    }
}

/// A repository last pushed more than a year ago.
pub fn stale_candidate(full_name: &str, stars: u32) -> CandidateRepo {
    CandidateRepo {
        pushed_at: Some(Utc::now() - Duration::days(400)),
        ..candidate(full_name, stars)
    }
}

/// Search client serving canned pages. Unknown pages are empty.
#[derive(Default)]
pub struct StubSearch {
    pages: Mutex<HashMap<(String, u32), Result<Vec<CandidateRepo>, u16>>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl StubSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, query: &str, page: u32, repos: Vec<CandidateRepo>) {
        self.pages
            .lock()
            .unwrap()
            .insert((query.to_string(), page), Ok(repos));
    }

    /// Make `page` of `query` fail with an HTTP status.
    pub fn fail_page(&self, query: &str, page: u32, status: u16) {
        self.pages
            .lock()
            .unwrap()
            .insert((query.to_string(), page), Err(status));
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for StubSearch {
    async fn search_repositories(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Vec<CandidateRepo>, SearchError> {
        self.calls.lock().unwrap().push((query.to_string(), page));
        match self.pages.lock().unwrap().get(&(query.to_string(), page)) {
            Some(Ok(repos)) => Ok(repos.clone()),
            Some(Err(status)) => Err(SearchError::UnexpectedStatus {
                status: *status,
                message: "stubbed failure".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Seen(String),
    Enqueue(String),
    Mark(String),
}

#[derive(Default)]
struct MemoryState {
    known: HashSet<String>,
    queue: Vec<String>,
    log: Vec<StoreCall>,
    fail_seen: HashSet<String>,
    fail_enqueue: HashSet<String>,
    fail_mark: HashSet<String>,
}

/// Dedup set plus work queue in memory, with a call log and injectable
/// failures keyed by repository name or target.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preload(&self, full_name: &str) {
        self.state
            .lock()
            .unwrap()
            .known
            .insert(full_name.to_string());
    }

    pub fn fail_seen(&self, full_name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_seen
            .insert(full_name.to_string());
    }

    pub fn fail_enqueue(&self, target: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_enqueue
            .insert(target.to_string());
    }

    pub fn fail_mark(&self, full_name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_mark
            .insert(full_name.to_string());
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_seen.clear();
        state.fail_enqueue.clear();
        state.fail_mark.clear();
    }

    pub fn is_known(&self, full_name: &str) -> bool {
        self.state.lock().unwrap().known.contains(full_name)
    }

    pub fn queue(&self) -> Vec<String> {
        self.state.lock().unwrap().queue.clone()
    }

    pub fn log(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().log.clone()
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn seen(&self, full_name: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(StoreCall::Seen(full_name.to_string()));
        if state.fail_seen.contains(full_name) {
            return Err(StoreError::Unavailable("seen failed".to_string()));
        }
        Ok(state.known.contains(full_name))
    }

    async fn mark(&self, full_name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(StoreCall::Mark(full_name.to_string()));
        if state.fail_mark.contains(full_name) {
            return Err(StoreError::Unavailable("mark failed".to_string()));
        }
        state.known.insert(full_name.to_string());
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for MemoryStore {
    async fn enqueue(&self, target: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(StoreCall::Enqueue(target.to_string()));
        if state.fail_enqueue.contains(target) {
            return Err(StoreError::Unavailable("enqueue failed".to_string()));
        }
        state.queue.push(target.to_string());
        Ok(())
    }
}

/// Notifier that records what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    repos: Mutex<Vec<String>>,
    summaries: Mutex<Vec<usize>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Names of repositories notified individually.
    pub fn repos(&self) -> Vec<String> {
        self.repos.lock().unwrap().clone()
    }

    /// Outcome counts of each summary sent.
    pub fn summaries(&self) -> Vec<usize> {
        self.summaries.lock().unwrap().clone()
    }

    fn result(&self) -> Result<(), NotifyError> {
        if self.fail {
            Err(NotifyError::Rejected {
                status: 400,
                body: "bad webhook".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_repo(
        &self,
        _ctx: &CycleContext,
        outcome: &CycleOutcome,
    ) -> Result<(), NotifyError> {
        self.repos.lock().unwrap().push(outcome.full_name.clone());
        self.result()
    }

    async fn notify_summary(
        &self,
        _ctx: &CycleContext,
        report: &CycleReport,
    ) -> Result<(), NotifyError> {
        self.summaries.lock().unwrap().push(report.outcomes.len());
        self.result()
    }
}
