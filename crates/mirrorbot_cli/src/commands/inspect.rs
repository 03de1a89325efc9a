use std::error::Error;

use super::shared::open_store;
use crate::config::Config;

/// Number of queued jobs listed by `status`.
const STATUS_JOB_LIMIT: u64 = 10;

/// Print the planned search queries without calling the API.
pub(crate) fn handle_queries(config: &Config) {
    let queries = config.pipeline_options().queries();
    if queries.is_empty() {
        println!("No queries configured (set search.keywords and search.languages).");
        return;
    }
    for query in &queries {
        println!("{query}");
    }
    println!();
    println!(
        "{} queries, up to {} results each",
        queries.len(),
        config.search.max_repos_per_keyword
    );
}

/// Print dedup and queue sizes and the oldest queued jobs.
pub(crate) async fn handle_status(config: &Config, database_url: &str) -> Result<(), Box<dyn Error>> {
    let store = open_store(database_url).await?;

    let known = store.known_count().await?;
    let jobs = store.job_count().await?;

    println!("Database:          {database_url}");
    println!("Known repositories: {known}");
    println!("Queued jobs:        {jobs}");
    println!(
        "Notifications:      {}",
        if config.notify.enabled { "enabled" } else { "disabled" }
    );

    let pending = store.pending_jobs(STATUS_JOB_LIMIT).await?;
    if !pending.is_empty() {
        println!();
        println!("Oldest jobs:");
        for job in pending {
            println!("  #{:<6} {}  {}", job.id, job.enqueued_at.to_rfc3339(), job.target);
        }
    }

    Ok(())
}
