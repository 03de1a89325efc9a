use std::error::Error;

use mirrorbot::notify::format_duration;
use mirrorbot::pipeline::OutcomeStatus;
use mirrorbot::{CancelCause, CycleContext, CycleReport, Pipeline, PipelineError};
use tokio_util::sync::CancellationToken;

use super::shared::build_app;
use crate::config::Config;
use crate::scheduler::{Schedule, run_scheduled};

/// Run cycles on the configured interval until shutdown.
pub(crate) async fn handle_run(
    config: &Config,
    database_url: &str,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let app = build_app(config, database_url).await?;
    let schedule = Schedule::from_config(config);

    tracing::info!(
        interval = ?schedule.interval,
        cycle_timeout = ?schedule.cycle_timeout,
        "Scheduler started"
    );

    run_scheduled(schedule, &shutdown, |ctx| {
        let pipeline = &app.pipeline;
        async move {
            // Errors are logged; the next tick starts a fresh cycle.
            let _ = run_cycle(pipeline, &ctx).await;
        }
    })
    .await;

    app.limiter.stop();
    Ok(())
}

/// Run a single cycle and print what happened.
pub(crate) async fn handle_once(
    config: &Config,
    database_url: &str,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let app = build_app(config, database_url).await?;
    let ctx = CycleContext::with_timeout(shutdown.child_token(), config.cycle_timeout());

    let result = run_cycle(&app.pipeline, &ctx).await;
    app.limiter.stop();

    let report = result?;
    print_report(&report);
    Ok(())
}

async fn run_cycle(pipeline: &Pipeline, ctx: &CycleContext) -> Result<CycleReport, PipelineError> {
    match pipeline.run(ctx).await {
        Ok(report) => Ok(report),
        Err(PipelineError::Cancelled(cancelled)) => {
            match cancelled.cause {
                CancelCause::Shutdown => tracing::info!("Cycle interrupted by shutdown"),
                CancelCause::DeadlineExceeded => {
                    tracing::warn!("Cycle exceeded its timeout and was cancelled")
                }
            }
            Err(PipelineError::Cancelled(cancelled))
        }
    }
}

fn print_report(report: &CycleReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            OutcomeStatus::Queued => println!("✅ {} -> {}", outcome.full_name, outcome.target),
            OutcomeStatus::Failed { stage, error } => {
                println!("❌ {} (failed at {}: {})", outcome.full_name, stage, error)
            }
        }
    }
    for err in &report.query_errors {
        println!("⚠️  {} (page {}): {}", err.query, err.page, err.error);
    }

    println!();
    println!(
        "{} queries, {} candidates, {} queued, {} failed in {}",
        report.queries,
        report.candidates,
        report.queued(),
        report.failed(),
        format_duration(report.elapsed)
    );
}
