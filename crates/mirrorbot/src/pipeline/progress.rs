//! Progress events emitted during a cycle.
//!
//! The pipeline itself only logs at debug level; callers that want
//! user-facing output install a [`ProgressCallback`].

use std::time::Duration;

use super::outcome::FailureStage;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CycleProgress {
    /// A cycle is starting.
    CycleStarted {
        /// Number of planned queries.
        queries: usize,
    },

    /// Starting query `index` (0-based) of `total`.
    QueryStarted {
        index: usize,
        total: usize,
        query: String,
    },

    /// A page came back from the search API.
    PageFetched {
        query: String,
        /// Page number (1-indexed).
        page: u32,
        count: usize,
    },

    /// A search call failed; the rest of this query is skipped.
    QueryFailed {
        query: String,
        page: u32,
        error: String,
    },

    /// All pages of a query were processed.
    QueryFinished {
        index: usize,
        query: String,
        candidates: usize,
    },

    /// A repository was enqueued and marked.
    RepoQueued { full_name: String, target: String },

    /// A repository was already processed in an earlier cycle.
    RepoSkipped { full_name: String },

    RepoFailed {
        full_name: String,
        stage: FailureStage,
        error: String,
    },

    /// A notification could not be delivered. The cycle carries on.
    NotificationFailed { error: String },

    /// The cycle finished without being cancelled.
    CycleComplete {
        queued: usize,
        failed: usize,
        query_errors: usize,
        elapsed: Duration,
    },
}

/// Callback for progress updates during a cycle.
pub type ProgressCallback = Box<dyn Fn(CycleProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: CycleProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_without_callback_is_a_no_op() {
        emit(None, CycleProgress::CycleStarted { queries: 1 });
    }

    #[test]
    fn test_emit_invokes_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let callback: ProgressCallback = Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(Some(&callback), CycleProgress::CycleStarted { queries: 4 });
        emit(
            Some(&callback),
            CycleProgress::RepoSkipped {
                full_name: "a/b".to_string(),
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
