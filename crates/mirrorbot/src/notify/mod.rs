//! Cycle notifications.
//!
//! A [`Notifier`] receives either one call per repository (batching off) or
//! one summary per cycle (batching on). [`DiscordNotifier`] renders both as
//! webhook messages and delivers them with bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{Cancelled, CycleContext};
use crate::http::HttpError;
use crate::pipeline::{CycleOutcome, CycleReport};

mod discord;
mod payload;
mod render;

pub use discord::{
    DEFAULT_MAX_MESSAGE_LENGTH, DiscordNotifier, MessageFormat, NotifyOptions, retry_after,
    summary_color,
};
pub use payload::{Embed, EmbedField, EmbedFooter, WebhookPayload, colors};
pub use render::{
    MIN_MESSAGE_LENGTH, NO_RESULTS, detail_line, format_duration, omitted_tail, render_summary,
    truncate,
};

/// Failure of a single delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("rate limited by webhook")]
    RateLimited { retry_after: Option<Duration> },

    #[error("webhook server error {status}")]
    Server { status: u16 },

    #[error("webhook rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("webhook rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("webhook delivery failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: DeliveryError },
}

/// Where cycle outcomes are reported.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report a single repository as soon as it has been processed.
    async fn notify_repo(
        &self,
        ctx: &CycleContext,
        outcome: &CycleOutcome,
    ) -> Result<(), NotifyError>;

    /// Report a finished cycle.
    async fn notify_summary(
        &self,
        ctx: &CycleContext,
        report: &CycleReport,
    ) -> Result<(), NotifyError>;
}
