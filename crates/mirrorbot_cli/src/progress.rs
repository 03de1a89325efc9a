use mirrorbot::pipeline::{CycleProgress, ProgressCallback};

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: CycleProgress) {
        match event {
            CycleProgress::CycleStarted { queries } => {
                tracing::info!(queries, "Starting discovery cycle");
            }

            CycleProgress::QueryStarted {
                index,
                total,
                query,
            } => {
                tracing::info!(query = %query, "Searching ({}/{})", index + 1, total);
            }

            CycleProgress::PageFetched { query, page, count } => {
                tracing::debug!(query = %query, page, count, "Fetched page");
            }

            CycleProgress::QueryFailed { query, page, error } => {
                tracing::warn!(query = %query, page, error = %error, "Search failed");
            }

            CycleProgress::QueryFinished {
                query, candidates, ..
            } => {
                tracing::debug!(query = %query, candidates, "Query complete");
            }

            CycleProgress::RepoQueued { full_name, target } => {
                tracing::debug!(repo = %full_name, target = %target, "Queued");
            }

            CycleProgress::RepoSkipped { full_name } => {
                tracing::debug!(repo = %full_name, "Already processed");
            }

            CycleProgress::RepoFailed {
                full_name,
                stage,
                error,
            } => {
                tracing::debug!(repo = %full_name, %stage, error = %error, "Failed");
            }

            CycleProgress::NotificationFailed { error } => {
                tracing::warn!(error = %error, "Notification not delivered");
            }

            CycleProgress::CycleComplete {
                queued,
                failed,
                query_errors,
                elapsed,
            } => {
                tracing::info!(
                    queued,
                    failed,
                    query_errors,
                    elapsed = ?elapsed,
                    "Discovery cycle complete"
                );
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// A pipeline progress callback that logs every event.
pub fn logging_callback() -> ProgressCallback {
    let reporter = LoggingReporter::new();
    Box::new(move |event| reporter.handle(event))
}
