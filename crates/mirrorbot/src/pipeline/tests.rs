use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::context::CancelCause;
use crate::rate_limit::TokenBucket;
use crate::search::CloneProtocol;
use crate::test_support::{
    MemoryStore, RecordingNotifier, StoreCall, StubSearch, candidate, stale_candidate,
};

struct Harness {
    search: Arc<StubSearch>,
    store: Arc<MemoryStore>,
    limiter: Arc<TokenBucket>,
}

impl Harness {
    fn new() -> Self {
        Self {
            search: Arc::new(StubSearch::new()),
            store: Arc::new(MemoryStore::new()),
            limiter: Arc::new(TokenBucket::new(100, Duration::from_secs(60)).unwrap()),
        }
    }

    fn pipeline(&self, options: PipelineOptions, max_repos: u32) -> Pipeline {
        let fetcher = Fetcher::new(self.search.clone(), self.limiter.clone(), max_repos);
        Pipeline::new(fetcher, self.store.clone(), self.store.clone(), options)
    }
}

fn options(keywords: &[&str], languages: &[&str]) -> PipelineOptions {
    PipelineOptions {
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        languages: languages.iter().map(|s| s.to_string()).collect(),
        target: TargetMode::Clone(CloneProtocol::Https),
        retention: RetentionPolicy::from_months(6, 100),
        batch_summary: true,
    }
}

fn ctx() -> CycleContext {
    CycleContext::new(CancellationToken::new())
}

#[tokio::test]
async fn test_queues_new_repositories_in_api_order() {
    let h = Harness::new();
    h.search.set_page(
        "cli language:rust",
        1,
        vec![candidate("a/one", 1), candidate("a/two", 2)],
    );

    let report = h
        .pipeline(options(&["cli"], &["rust"]), 100)
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(report.queries, 1);
    assert_eq!(report.candidates, 2);
    assert_eq!(report.queued(), 2);
    assert_eq!(
        h.store.queue(),
        vec![
            "https://github.com/a/one.git",
            "https://github.com/a/two.git"
        ]
    );
    assert!(h.store.is_known("a/one"));
    assert!(h.store.is_known("a/two"));
}

#[tokio::test]
async fn test_enqueue_happens_before_mark() {
    let h = Harness::new();
    h.search
        .set_page("cli language:rust", 1, vec![candidate("a/one", 1)]);

    h.pipeline(options(&["cli"], &["rust"]), 100)
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(
        h.store.log(),
        vec![
            StoreCall::Seen("a/one".to_string()),
            StoreCall::Enqueue("https://github.com/a/one.git".to_string()),
            StoreCall::Mark("a/one".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_filtered_and_seen_repositories_produce_no_outcome() {
    let h = Harness::new();
    h.store.preload("a/old");
    h.search.set_page(
        "cli language:rust",
        1,
        vec![
            stale_candidate("a/stale", 5),
            stale_candidate("a/popular", 500),
            candidate("a/old", 1),
        ],
    );

    let report = h
        .pipeline(options(&["cli"], &["rust"]), 100)
        .run(&ctx())
        .await
        .unwrap();

    let names: Vec<_> = report.outcomes.iter().map(|o| o.full_name.as_str()).collect();
    assert_eq!(names, vec!["a/popular"]);
    // The filtered repository never reaches the store.
    assert!(!h.store.log().contains(&StoreCall::Seen("a/stale".to_string())));
    assert_eq!(h.store.queue().len(), 1);
}

#[tokio::test]
async fn test_mark_failure_is_redetected_next_cycle() {
    let h = Harness::new();
    h.search
        .set_page("cli language:rust", 1, vec![candidate("a/one", 1)]);
    h.store.fail_mark("a/one");
    let pipeline = h.pipeline(options(&["cli"], &["rust"]), 100);

    let first = pipeline.run(&ctx()).await.unwrap();

    assert_eq!(
        first.outcomes[0].status,
        OutcomeStatus::Failed {
            stage: FailureStage::Mark,
            error: "store unavailable: mark failed".to_string(),
        }
    );
    assert_eq!(h.store.queue(), vec!["https://github.com/a/one.git"]);
    assert!(!h.store.is_known("a/one"));

    h.store.clear_faults();
    let second = pipeline.run(&ctx()).await.unwrap();

    assert!(second.outcomes[0].is_queued());
    assert_eq!(h.store.queue().len(), 2);
    assert!(h.store.is_known("a/one"));
}

#[tokio::test]
async fn test_enqueue_failure_skips_mark() {
    let h = Harness::new();
    h.search.set_page(
        "cli language:rust",
        1,
        vec![candidate("a/one", 1), candidate("a/two", 1)],
    );
    h.store.fail_enqueue("https://github.com/a/one.git");

    let report = h
        .pipeline(options(&["cli"], &["rust"]), 100)
        .run(&ctx())
        .await
        .unwrap();

    assert!(matches!(
        report.outcomes[0].status,
        OutcomeStatus::Failed {
            stage: FailureStage::Enqueue,
            ..
        }
    ));
    assert!(!h.store.log().contains(&StoreCall::Mark("a/one".to_string())));
    assert!(!h.store.is_known("a/one"));
    assert!(report.outcomes[1].is_queued());
}

#[tokio::test]
async fn test_dedup_error_aborts_only_that_repository() {
    let h = Harness::new();
    h.search.set_page(
        "cli language:rust",
        1,
        vec![candidate("a/one", 1), candidate("a/two", 1)],
    );
    h.store.fail_seen("a/one");

    let report = h
        .pipeline(options(&["cli"], &["rust"]), 100)
        .run(&ctx())
        .await
        .unwrap();

    assert!(matches!(
        report.outcomes[0].status,
        OutcomeStatus::Failed {
            stage: FailureStage::DedupCheck,
            ..
        }
    ));
    assert!(
        !h.store
            .log()
            .contains(&StoreCall::Enqueue("https://github.com/a/one.git".to_string()))
    );
    assert!(!h.store.is_known("a/one"));
    assert!(report.outcomes[1].is_queued());
}

#[tokio::test]
async fn test_query_error_continues_with_next_query() {
    let h = Harness::new();
    h.search
        .set_page("cli language:go", 1, vec![candidate("a/go", 1)]);
    h.search.fail_page("cli language:go", 2, 502);
    h.search
        .set_page("cli language:rust", 1, vec![candidate("a/rust", 1)]);

    let report = h
        .pipeline(options(&["cli"], &["go", "rust"]), 300)
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(report.query_errors.len(), 1);
    assert_eq!(report.query_errors[0].query, "cli language:go");
    assert_eq!(report.query_errors[0].page, 2);
    // Page 1 of the failed query still counts.
    assert_eq!(report.queued(), 2);
    assert_eq!(
        h.search.calls(),
        vec![
            ("cli language:go".to_string(), 1),
            ("cli language:go".to_string(), 2),
            ("cli language:rust".to_string(), 1),
            ("cli language:rust".to_string(), 2),
        ]
    );
}

#[tokio::test]
async fn test_pagination_stops_at_page_limit_and_on_empty_page() {
    let h = Harness::new();
    let full_page: Vec<_> = (0..3).map(|i| candidate(&format!("a/r{i}"), 1)).collect();
    for page in 1..=10 {
        h.search.set_page("cli language:rust", page, full_page.clone());
    }
    h.search
        .set_page("cli language:go", 1, vec![candidate("b/one", 1)]);

    h.pipeline(options(&["cli"], &["go", "rust"]), 250)
        .run(&ctx())
        .await
        .unwrap();

    let calls = h.search.calls();
    let rust_pages: Vec<u32> = calls
        .iter()
        .filter(|(q, _)| q == "cli language:rust")
        .map(|(_, p)| *p)
        .collect();
    let go_pages: Vec<u32> = calls
        .iter()
        .filter(|(q, _)| q == "cli language:go")
        .map(|(_, p)| *p)
        .collect();
    assert_eq!(rust_pages, vec![1, 2, 3]);
    assert_eq!(go_pages, vec![1, 2]);
}

#[tokio::test]
async fn test_cancelling_after_first_query_stops_the_cycle() {
    let h = Harness::new();
    h.search
        .set_page("foo language:go", 1, vec![candidate("a/one", 1)]);
    h.search
        .set_page("bar language:go", 1, vec![candidate("a/two", 1)]);

    let token = CancellationToken::new();
    let cancel = token.clone();
    let pipeline = h
        .pipeline(options(&["foo", "bar"], &["go"]), 100)
        .with_progress(Box::new(move |event| {
            if let CycleProgress::QueryFinished { index: 0, .. } = event {
                cancel.cancel();
            }
        }));

    let err = pipeline.run(&CycleContext::new(token)).await.unwrap_err();

    let PipelineError::Cancelled(cancelled) = err;
    assert_eq!(cancelled.cause, CancelCause::Shutdown);
    assert!(h.search.calls().iter().all(|(q, _)| q == "foo language:go"));
    // Work from the first query is kept.
    assert!(h.store.is_known("a/one"));
    assert!(!h.store.is_known("a/two"));
}

#[tokio::test]
async fn test_summary_is_sent_once_when_batching() {
    let h = Harness::new();
    h.search.set_page(
        "cli language:rust",
        1,
        vec![candidate("a/one", 1), candidate("a/two", 1)],
    );
    let notifier = Arc::new(RecordingNotifier::new());

    h.pipeline(options(&["cli"], &["rust"]), 100)
        .with_notifier(notifier.clone())
        .run(&ctx())
        .await
        .unwrap();

    assert!(notifier.repos().is_empty());
    assert_eq!(notifier.summaries(), vec![2]);
}

#[tokio::test]
async fn test_empty_cycle_still_sends_a_summary() {
    let h = Harness::new();
    let notifier = Arc::new(RecordingNotifier::new());

    h.pipeline(options(&["cli"], &["rust"]), 100)
        .with_notifier(notifier.clone())
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(notifier.summaries(), vec![0]);
}

#[tokio::test]
async fn test_per_repo_notifications_when_not_batching() {
    let h = Harness::new();
    h.search.set_page(
        "cli language:rust",
        1,
        vec![candidate("a/one", 1), candidate("a/two", 1)],
    );
    h.store.fail_enqueue("https://github.com/a/two.git");
    let notifier = Arc::new(RecordingNotifier::new());
    let mut opts = options(&["cli"], &["rust"]);
    opts.batch_summary = false;

    h.pipeline(opts, 100)
        .with_notifier(notifier.clone())
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(notifier.repos(), vec!["a/one", "a/two"]);
    assert!(notifier.summaries().is_empty());
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_the_cycle() {
    let h = Harness::new();
    h.search
        .set_page("cli language:rust", 1, vec![candidate("a/one", 1)]);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let report = h
        .pipeline(options(&["cli"], &["rust"]), 100)
        .with_notifier(Arc::new(RecordingNotifier::failing()))
        .with_progress(Box::new(move |event| {
            if let CycleProgress::NotificationFailed { error } = event {
                sink.lock().unwrap().push(error);
            }
        }))
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(report.queued(), 1);
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_gates_every_search_call() {
    let h = Harness {
        limiter: Arc::new(TokenBucket::new(2, Duration::from_secs(60)).unwrap()),
        ..Harness::new()
    };
    h.limiter.start();
    for page in 1..=3 {
        h.search
            .set_page("cli language:rust", page, vec![candidate(&format!("a/p{page}"), 1)]);
    }
    let started = tokio::time::Instant::now();

    let report = h
        .pipeline(options(&["cli"], &["rust"]), 300)
        .run(&ctx())
        .await
        .unwrap();

    assert_eq!(report.queued(), 3);
    assert!(started.elapsed() >= Duration::from_secs(60));
}
