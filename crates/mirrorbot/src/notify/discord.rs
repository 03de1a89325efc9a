//! Discord webhook delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::payload::{Embed, EmbedField, EmbedFooter, WebhookPayload, colors};
use super::render::{detail_line, format_duration, render_summary, truncate};
use super::{DeliveryError, Notifier, NotifyError};
use crate::context::CycleContext;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::pipeline::{CycleOutcome, CycleReport, OutcomeStatus};
use crate::retry::{RetryAction, RetryConfig, RetryError, with_retry};

/// Discord rejects plain messages longer than this.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 2000;

const FOOTER: &str = "mirrorbot";
const REPO_DESCRIPTION_WIDTH: usize = 100;
const ERROR_BODY_WIDTH: usize = 200;

/// How messages are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// Rich embeds with colour and fields.
    #[default]
    Embed,
    /// Plain `content` text.
    Text,
}

#[derive(Debug, Clone)]
pub struct NotifyOptions {
    pub max_message_length: usize,
    pub format: MessageFormat,
    pub retry: RetryConfig,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            format: MessageFormat::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Posts messages to a Discord webhook.
pub struct DiscordNotifier {
    transport: Arc<dyn HttpTransport>,
    webhook_url: String,
    options: NotifyOptions,
}

impl DiscordNotifier {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        webhook_url: impl Into<String>,
        options: NotifyOptions,
    ) -> Self {
        Self {
            transport,
            webhook_url: webhook_url.into(),
            options,
        }
    }

    pub fn options(&self) -> &NotifyOptions {
        &self.options
    }

    /// Message for a single processed repository.
    pub fn repo_payload(&self, outcome: &CycleOutcome) -> WebhookPayload {
        let status = match &outcome.status {
            OutcomeStatus::Queued => "✅ Queued".to_string(),
            OutcomeStatus::Failed { stage, error } => format!("❌ Failed at {stage}: {error}"),
        };

        match self.options.format {
            MessageFormat::Text => {
                let text = format!(
                    "{}\n{status}\n{}",
                    detail_line(outcome),
                    outcome.html_url
                );
                WebhookPayload::text(truncate(&text, self.options.max_message_length))
            }
            MessageFormat::Embed => WebhookPayload::embed(Embed {
                title: format!("New repository found: {}", outcome.full_name),
                description: truncate(&outcome.description, REPO_DESCRIPTION_WIDTH),
                url: Some(outcome.html_url.clone()),
                color: if outcome.is_queued() {
                    colors::GREEN
                } else {
                    colors::RED
                },
                fields: vec![
                    EmbedField::inline("Stars", outcome.stars.to_string()),
                    EmbedField::inline(
                        "Language",
                        outcome.language.as_deref().unwrap_or("Unknown"),
                    ),
                    EmbedField::new("Status", status),
                    EmbedField::new("Target", outcome.target.clone()),
                ],
                ..footer_and_timestamp()
            }),
        }
    }

    /// Message for a finished cycle.
    pub fn summary_payload(&self, report: &CycleReport) -> WebhookPayload {
        let text = render_summary(report, self.options.max_message_length);

        match self.options.format {
            MessageFormat::Text => WebhookPayload::text(text),
            MessageFormat::Embed => WebhookPayload::embed(Embed {
                title: "Repository discovery summary".to_string(),
                description: text,
                color: summary_color(report),
                fields: vec![
                    EmbedField::inline("Found", report.outcomes.len().to_string()),
                    EmbedField::inline("Queued", report.queued().to_string()),
                    EmbedField::inline("Failed", report.failed().to_string()),
                    EmbedField::inline("Duration", format_duration(report.elapsed)),
                ],
                ..footer_and_timestamp()
            }),
        }
    }

    /// Send a plain text message, cut to the configured length.
    pub async fn send_text(&self, ctx: &CycleContext, text: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload::text(truncate(text, self.options.max_message_length));
        self.deliver(ctx, &payload).await
    }

    /// POST `payload`, retrying transient failures.
    pub async fn deliver(
        &self,
        ctx: &CycleContext,
        payload: &WebhookPayload,
    ) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(payload)?;

        let result = with_retry(
            ctx,
            &self.options.retry,
            || self.attempt(body.clone()),
            classify,
        )
        .await;

        result.map_err(|err| {
            let err = match err {
                RetryError::Cancelled(cancelled) => NotifyError::Cancelled(cancelled),
                RetryError::Permanent(DeliveryError::Rejected { status, body }) => {
                    NotifyError::Rejected { status, body }
                }
                RetryError::Permanent(last) => NotifyError::Exhausted { attempts: 1, last },
                RetryError::Exhausted { attempts, last } => {
                    NotifyError::Exhausted { attempts, last }
                }
            };
            tracing::warn!(error = %err, "Webhook delivery failed");
            err
        })
    }

    async fn attempt(&self, body: Vec<u8>) -> Result<(), DeliveryError> {
        let request = HttpRequest::post_json(self.webhook_url.clone(), body);
        let response = self.transport.send(request).await?;

        if response.is_success() {
            return Ok(());
        }

        match response.status {
            429 => Err(DeliveryError::RateLimited {
                retry_after: retry_after(&response),
            }),
            status @ 500..=599 => Err(DeliveryError::Server { status }),
            status => Err(DeliveryError::Rejected {
                status,
                body: truncate(&response.body_text(), ERROR_BODY_WIDTH),
            }),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify_repo(
        &self,
        ctx: &CycleContext,
        outcome: &CycleOutcome,
    ) -> Result<(), NotifyError> {
        self.deliver(ctx, &self.repo_payload(outcome)).await
    }

    async fn notify_summary(
        &self,
        ctx: &CycleContext,
        report: &CycleReport,
    ) -> Result<(), NotifyError> {
        self.deliver(ctx, &self.summary_payload(report)).await
    }
}

fn footer_and_timestamp() -> Embed {
    Embed {
        footer: Some(EmbedFooter {
            text: FOOTER.to_string(),
        }),
        timestamp: Some(Utc::now().to_rfc3339()),
        ..Embed::default()
    }
}

/// Gray: nothing found. Green: no failures. Red: nothing queued. Orange otherwise.
pub fn summary_color(report: &CycleReport) -> u32 {
    if report.outcomes.is_empty() {
        colors::GRAY
    } else if report.failed() == 0 {
        colors::GREEN
    } else if report.queued() == 0 {
        colors::RED
    } else {
        colors::ORANGE
    }
}

fn classify(err: &DeliveryError) -> RetryAction {
    match err {
        DeliveryError::Transport(_) | DeliveryError::Server { .. } => RetryAction::Retry,
        DeliveryError::RateLimited {
            retry_after: Some(delay),
        } => RetryAction::RetryAfter(*delay),
        DeliveryError::RateLimited { retry_after: None } => RetryAction::Retry,
        DeliveryError::Rejected { .. } => RetryAction::Fail,
    }
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Server-requested delay: the `Retry-After` header, else the JSON body's
/// `retry_after` (seconds, possibly fractional).
pub fn retry_after(response: &HttpResponse) -> Option<Duration> {
    let secs = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .or_else(|| {
            serde_json::from_slice::<RateLimitBody>(&response.body)
                .ok()
                .map(|b| b.retry_after)
        })?;
    Duration::try_from_secs_f64(secs).ok()
}
