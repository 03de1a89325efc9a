//! Configuration file support for mirrorbot.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Environment variables (prefixed with `MIRRORBOT_`, nested keys separated
//!    by `__`, e.g. `MIRRORBOT_NOTIFY__WEBHOOK_URL`)
//! 2. The file passed with `--config`
//! 3. `./mirrorbot.toml`
//! 4. `~/.config/mirrorbot/config.toml`
//! 5. Built-in defaults
//!
//! `GITHUB_TOKEN` and `DISCORD_WEBHOOK_URL` are used when the corresponding
//! settings are missing.
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or GITHUB_TOKEN
//!
//! [search]
//! keywords = ["self-hosted", "homelab"]
//! languages = ["go", "rust"]
//! max_repos_per_keyword = 200
//! fork_instead_of_clone = false
//! clone_protocol = "ssh"
//!
//! [filter]
//! max_inactive_months = 6
//! min_stars_for_stale = 100
//!
//! [notify]
//! enabled = true
//! webhook_url = "https://discord.com/api/webhooks/..."
//! batch_summary = true
//!
//! [schedule]
//! interval_minutes = 60
//! cycle_timeout_minutes = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigBuilder as Builder, Environment, File, FileFormat};
use config::builder::DefaultState;
use directories::ProjectDirs;
use mirrorbot::github::{DEFAULT_API_URL, DEFAULT_SORT};
use mirrorbot::notify::{DEFAULT_MAX_MESSAGE_LENGTH, MIN_MESSAGE_LENGTH, MessageFormat, NotifyOptions};
use mirrorbot::rate_limit::{DEFAULT_CAPACITY, DEFAULT_PERIOD};
use mirrorbot::retry::{DEFAULT_MAX_RETRIES, RetryConfig};
use mirrorbot::search::{CloneProtocol, RetentionPolicy, TargetMode};
use mirrorbot::PipelineOptions;
use serde::Deserialize;
use thiserror::Error;

const APP_NAME: &str = "mirrorbot";
const ENV_PREFIX: &str = "MIRRORBOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub search: SearchConfig,
    pub filter: FilterConfig,
    pub rate_limit: RateLimitConfig,
    pub notify: NotifyConfig,
    pub database: DatabaseConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. Falls back to `GITHUB_TOKEN`.
    pub token: Option<String>,
    /// API root, for GitHub Enterprise.
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// What to search for.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub keywords: Vec<String>,
    pub languages: Vec<String>,
    /// Upper bound on results per query (at most 1000 are reachable).
    pub max_repos_per_keyword: u32,
    /// Queue the web page for forking instead of a clone URL.
    pub fork_instead_of_clone: bool,
    pub clone_protocol: CloneProtocol,
    /// Search sort key (`updated`, `stars`, ...).
    pub sort: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            languages: Vec::new(),
            max_repos_per_keyword: 100,
            fork_instead_of_clone: false,
            clone_protocol: CloneProtocol::default(),
            sort: DEFAULT_SORT.to_string(),
        }
    }
}

/// Retention thresholds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Months (of 30 days) since the last push for a repository to count as active.
    pub max_inactive_months: u32,
    /// Inactive repositories with at least this many stars are kept anyway.
    pub min_stars_for_stale: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_inactive_months: 6,
            min_stars_for_stale: 100,
        }
    }
}

/// Search API call budget.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls allowed per window.
    pub capacity: u32,
    /// Window length in seconds.
    pub period_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            period_secs: DEFAULT_PERIOD.as_secs(),
        }
    }
}

/// Discord notifications.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    /// Falls back to `DISCORD_WEBHOOK_URL`.
    pub webhook_url: Option<String>,
    /// One summary per cycle instead of one message per repository.
    pub batch_summary: bool,
    /// Character cap for a single message.
    pub max_message_length: usize,
    pub format: MessageFormat,
    /// Retries after the first failed delivery.
    pub max_retries: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            batch_summary: true,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            format: MessageFormat::default(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://` or `postgres://`). Defaults to a SQLite
    /// file in the XDG state directory.
    pub url: Option<String>,
}

/// Daemon scheduling.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
    /// A cycle still running after this long is cancelled.
    pub cycle_timeout_minutes: u64,
    /// Run a cycle immediately instead of waiting one interval.
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            cycle_timeout_minutes: 30,
            run_on_start: true,
        }
    }
}

/// Log output.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or full filter directive. `RUST_LOG` takes precedence.
    pub level: String,
    /// Append logs to this file instead of stdout.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from all layers.
    ///
    /// An explicit `path` must exist; the XDG and local files are optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("mirrorbot.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./mirrorbot.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(Self::environment());

        let mut config = Self::from_builder(builder)?;
        config.apply_fallbacks(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `MIRRORBOT_` variables, e.g. `MIRRORBOT_SEARCH__KEYWORDS=a,b`.
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("search.keywords")
            .with_list_parse_key("search.languages")
    }

    fn from_builder(builder: Builder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize::<Config>()?)
    }

    /// Fill unset credentials from well-known variables.
    fn apply_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        if !present(&self.github.token) {
            self.github.token = lookup("GITHUB_TOKEN").filter(|s| !s.trim().is_empty());
        }
        if !present(&self.notify.webhook_url) {
            self.notify.webhook_url = lookup("DISCORD_WEBHOOK_URL").filter(|s| !s.trim().is_empty());
        }
    }

    /// Check settings every command relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.rate_limit.capacity == 0 {
            return invalid("rate_limit.capacity must be at least 1");
        }
        if self.rate_limit.period_secs == 0 {
            return invalid("rate_limit.period_secs must be at least 1");
        }
        if self.schedule.interval_minutes == 0 {
            return invalid("schedule.interval_minutes must be at least 1");
        }
        if self.schedule.cycle_timeout_minutes == 0 {
            return invalid("schedule.cycle_timeout_minutes must be at least 1");
        }
        if self.notify.max_message_length < MIN_MESSAGE_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "notify.max_message_length must be at least {MIN_MESSAGE_LENGTH}"
            )));
        }
        if self.notify.enabled && self.webhook_url().is_none() {
            return invalid(
                "notify.enabled is set but no webhook URL is configured \
                 (notify.webhook_url or DISCORD_WEBHOOK_URL)",
            );
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the credentials a search cycle needs.
    pub fn validate_for_cycle(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.github_token().is_none() {
            return Err(ConfigError::Invalid(
                "GitHub token is not set (github.token, MIRRORBOT_GITHUB__TOKEN or GITHUB_TOKEN)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.notify
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            keywords: self.search.keywords.clone(),
            languages: self.search.languages.clone(),
            target: TargetMode::new(self.search.fork_instead_of_clone, self.search.clone_protocol),
            retention: RetentionPolicy::from_months(
                self.filter.max_inactive_months,
                self.filter.min_stars_for_stale,
            ),
            batch_summary: self.notify.batch_summary,
        }
    }

    pub fn notify_options(&self) -> NotifyOptions {
        NotifyOptions {
            max_message_length: self.notify.max_message_length,
            format: self.notify.format,
            retry: RetryConfig::default().with_max_retries(self.notify.max_retries),
        }
    }

    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_secs(self.rate_limit.period_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_minutes * 60)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.schedule.cycle_timeout_minutes * 60)
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("mirrorbot.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/mirrorbot` or `~/.local/state/mirrorbot`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
