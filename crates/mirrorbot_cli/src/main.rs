//! Mirrorbot CLI - scheduled repository discovery daemon.

mod commands;
mod config;
mod logging;
mod progress;
mod scheduler;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "mirrorbot")]
#[command(version)]
#[command(about = "Discover GitHub repositories and queue them for mirroring")]
#[command(
    long_about = "Mirrorbot periodically searches GitHub for repositories matching configured \
keywords and languages, keeps the recently active or popular ones, and queues each new one \
exactly once for an external mirroring worker. Results can be reported to a Discord webhook."
)]
#[command(after_long_help = r#"EXAMPLES
    Run the daemon with the default schedule:
        $ mirrorbot run

    Run a single cycle and print the results:
        $ mirrorbot once

    Show the queries a cycle would run:
        $ mirrorbot queries

    Check that the webhook works:
        $ mirrorbot notify-test "hello from mirrorbot"

CONFIGURATION
    Mirrorbot reads configuration from (later entries win):
      1. ~/.config/mirrorbot/config.toml (or $XDG_CONFIG_HOME/mirrorbot/config.toml)
      2. ./mirrorbot.toml
      3. The file given with --config
      4. Environment variables (MIRRORBOT_ prefix, nested keys joined with __)
    A .env file in the current directory is loaded first.

ENVIRONMENT VARIABLES
    GITHUB_TOKEN                    GitHub token, if github.token is unset
    DISCORD_WEBHOOK_URL             Webhook URL, if notify.webhook_url is unset
    MIRRORBOT_DATABASE__URL         Database connection string (default: ~/.local/state/mirrorbot/mirrorbot.db)
    MIRRORBOT_SEARCH__KEYWORDS      Comma-separated keywords
    MIRRORBOT_SEARCH__LANGUAGES     Comma-separated languages
    MIRRORBOT_NOTIFY__ENABLED       Enable Discord notifications
    RUST_LOG                        Log filter, overrides logging.level
"#)]
struct Cli {
    /// Configuration file to load on top of the default locations
    #[arg(short, long, global = true, env = "MIRRORBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run discovery cycles on the configured schedule until interrupted
    Run,
    /// Run a single discovery cycle and print the results
    Once,
    /// Print the search queries a cycle would run
    Queries,
    /// Show dedup store and work queue status
    Status,
    /// Send a test message to the configured webhook
    NotifyTest {
        /// Message text
        #[arg(default_value = "mirrorbot webhook test")]
        message: String,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh {
        /// Confirm that all known repositories and queued jobs are deleted
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::Config::load(cli.config.as_deref())?;
    config.validate()?;
    logging::init(&config.logging)?;

    if let Commands::Queries = cli.command {
        commands::inspect::handle_queries(&config);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    shutdown::install_shutdown_handler(shutdown.clone());

    if let Commands::NotifyTest { message } = &cli.command {
        return commands::notify::handle_notify_test(&config, message, shutdown).await;
    }

    let database_url = config
        .database_url()
        .ok_or("could not determine a database location; set database.url")?;

    match cli.command {
        Commands::Run => {
            commands::cycle::handle_run(&config, &database_url, shutdown).await?;
        }
        Commands::Once => {
            commands::cycle::handle_once(&config, &database_url, shutdown).await?;
        }
        Commands::Status => {
            commands::inspect::handle_status(&config, &database_url).await?;
        }
        Commands::Migrate { action } => {
            commands::shared::ensure_sqlite_parent(&database_url)?;
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Queries | Commands::NotifyTest { .. } => {}
    }

    Ok(())
}
