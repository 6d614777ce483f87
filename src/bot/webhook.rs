//! Webhook mode.
//!
//! Uses teloxide's axum listener: it calls `setWebhook`, serves updates on
//! the configured port and calls `deleteWebhook` once stopped.

use std::net::SocketAddr;

use anyhow::Context;
use teloxide::update_listeners::UpdateListener;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::platform::telegram::ThrottledBot;

/// Register the webhook and start the HTTP server.
pub async fn listener(
    config: &Config,
    bot: &ThrottledBot,
) -> anyhow::Result<impl UpdateListener<Err = std::convert::Infallible>> {
    let raw = config
        .webhook_url
        .as_deref()
        .context("WEBHOOK_URL must be set when using webhook mode")?;
    let url = Url::parse(raw).with_context(|| format!("invalid WEBHOOK_URL: {raw}"))?;

    let address = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    let mut options = Options::new(address, url.clone());
    if let Some(ref secret) = config.webhook_secret {
        options = options.secret_token(secret.clone());
        info!("Webhook secret token configured");
    }

    info!("Setting webhook URL: {}", url);
    info!("Listening on: {}", address);

    // setWebhook does not need throttling
    let listener = webhooks::axum(bot.inner().clone(), options)
        .await
        .context("failed to set up webhook")?;
    info!("Webhook setup complete, waiting for updates...");
    Ok(listener)
}
