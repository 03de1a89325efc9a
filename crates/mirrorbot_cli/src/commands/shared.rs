use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mirrorbot::http::{HttpTransport, ReqwestTransport};
use mirrorbot::{
    DiscordNotifier, Fetcher, GitHubSearchClient, Notifier, Pipeline, SqlStore, TokenBucket,
    connect_and_migrate,
};

use crate::config::Config;
use crate::progress::logging_callback;

/// Per-request timeout for search calls.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for webhook deliveries.
pub(crate) const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a discovery cycle needs, wired from configuration.
pub(crate) struct App {
    pub(crate) pipeline: Pipeline,
    pub(crate) limiter: Arc<TokenBucket>,
}

pub(crate) fn http_transport(
    timeout: Duration,
) -> Result<Arc<dyn HttpTransport>, Box<dyn Error>> {
    Ok(Arc::new(ReqwestTransport::with_timeout(timeout)?))
}

/// Create the parent directory of a SQLite database file.
pub(crate) fn ensure_sqlite_parent(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub(crate) async fn open_store(database_url: &str) -> Result<Arc<SqlStore>, Box<dyn Error>> {
    ensure_sqlite_parent(database_url)?;
    let db = connect_and_migrate(database_url).await?;
    Ok(Arc::new(SqlStore::new(db)))
}

/// The configured webhook notifier, if notifications are enabled.
pub(crate) fn build_notifier(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
) -> Option<Arc<dyn Notifier>> {
    if !config.notify.enabled {
        return None;
    }
    let webhook_url = config.webhook_url()?;
    Some(Arc::new(DiscordNotifier::new(
        transport,
        webhook_url,
        config.notify_options(),
    )))
}

/// Wire the pipeline and start the rate limiter's refill task.
pub(crate) async fn build_app(config: &Config, database_url: &str) -> Result<App, Box<dyn Error>> {
    config.validate_for_cycle()?;
    let token = config.github_token().ok_or("GitHub token is not set")?;

    let client = GitHubSearchClient::new(http_transport(SEARCH_TIMEOUT)?, token)
        .with_api_url(config.github.api_url.as_str())
        .with_sort(config.search.sort.as_str());

    let limiter = Arc::new(TokenBucket::new(
        config.rate_limit.capacity,
        config.rate_limit_period(),
    )?);
    let fetcher = Fetcher::new(
        Arc::new(client),
        Arc::clone(&limiter),
        config.search.max_repos_per_keyword,
    );

    let store = open_store(database_url).await?;
    let options = config.pipeline_options();
    if options.queries().is_empty() {
        tracing::warn!("No search queries configured; set search.keywords and search.languages");
    }

    let mut pipeline = Pipeline::new(fetcher, store.clone(), store, options)
        .with_progress(logging_callback());
    match build_notifier(config, http_transport(WEBHOOK_TIMEOUT)?) {
        Some(notifier) => pipeline = pipeline.with_notifier(notifier),
        None => tracing::info!("Notifications disabled"),
    }

    limiter.start();
    Ok(App { pipeline, limiter })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_sqlite_urls_are_ignored() {
        assert!(ensure_sqlite_parent("postgres://localhost/mirrorbot").is_ok());
        assert!(ensure_sqlite_parent("sqlite::memory:").is_ok());
    }

    #[test]
    fn test_notifier_requires_enabled_flag_and_webhook() {
        let transport = http_transport(WEBHOOK_TIMEOUT).unwrap();

        let mut config = Config::default();
        config.notify.webhook_url = Some("https://discord.test/hook".to_string());
        assert!(build_notifier(&config, Arc::clone(&transport)).is_none());

        config.notify.enabled = true;
        assert!(build_notifier(&config, Arc::clone(&transport)).is_some());

        config.notify.webhook_url = None;
        assert!(build_notifier(&config, transport).is_none());
    }
}
