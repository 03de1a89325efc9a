use std::error::Error;
use std::time::Duration;

use mirrorbot::{CycleContext, DiscordNotifier};
use tokio_util::sync::CancellationToken;

use super::shared::{WEBHOOK_TIMEOUT, http_transport};
use crate::config::Config;

/// Upper bound on delivery including retries.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Post `message` to the configured webhook.
///
/// Works whether or not `notify.enabled` is set, so a webhook can be checked
/// before turning notifications on.
pub(crate) async fn handle_notify_test(
    config: &Config,
    message: &str,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let webhook_url = config
        .webhook_url()
        .ok_or("no webhook URL configured (notify.webhook_url or DISCORD_WEBHOOK_URL)")?;

    let notifier = DiscordNotifier::new(
        http_transport(WEBHOOK_TIMEOUT)?,
        webhook_url,
        config.notify_options(),
    );
    let ctx = CycleContext::with_timeout(shutdown.child_token(), DELIVERY_TIMEOUT);

    notifier.send_text(&ctx, message).await?;
    println!("Message delivered.");
    Ok(())
}
