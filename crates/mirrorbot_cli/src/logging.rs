use std::fs::OpenOptions;
use std::sync::Mutex;

use console::Term;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Turn a configured level into a filter directive.
///
/// A bare level applies to our crates only; dependencies stay at `warn`.
/// Anything that already looks like a directive is used verbatim.
fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("warn,mirrorbot={level},mirrorbot_cli={level}")
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub(crate) fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(&config.level))?,
    };

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(Term::stdout().is_term())
                .init();
        }
    }

    Ok(())
}
