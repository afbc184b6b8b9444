//! Notification channels.
//!
//! Every channel renders its own Handlebars template against the incident
//! content and delivers the result to one external service. Channels are
//! built from a (possibly per-request) `Config` by `build_channels`.

pub mod email;
pub mod lark;
pub mod msteams;
pub mod slack;
pub mod telegram;
pub mod templates;

use crate::config::Config;
use crate::core::ChannelProvider;
use std::sync::Arc;
use thiserror::Error;

pub use email::EmailChannel;
pub use lark::LarkChannel;
pub use msteams::MsTeamsChannel;
pub use slack::SlackChannel;
pub use telegram::TelegramChannel;
pub use templates::TemplateRenderer;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("{channel} channel is enabled but `{field}` is not configured")]
    MissingConfig {
        channel: &'static str,
        field: &'static str,
    },

    #[error("failed to render template: {0}")]
    Template(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} returned non-success status {status}: {body}")]
    Status {
        channel: &'static str,
        status: u16,
        body: String,
    },

    #[error("{channel} rejected the message: {message}")]
    Rejected {
        channel: &'static str,
        message: String,
    },

    #[error("failed to send email: {0}")]
    Email(String),
}

/// Returns `Err(MissingConfig)` when `value` is empty.
pub(crate) fn require(
    channel: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ChannelError> {
    if value.trim().is_empty() {
        return Err(ChannelError::MissingConfig { channel, field });
    }
    Ok(())
}

/// Builds the enabled channels, in a fixed order: Slack, Telegram, Email,
/// Microsoft Teams, Lark.
pub fn build_channels(
    config: &Config,
    http: &reqwest::Client,
) -> Result<Vec<Arc<dyn ChannelProvider>>, ChannelError> {
    let alert = &config.alert;
    let mut channels: Vec<Arc<dyn ChannelProvider>> = Vec::new();

    if alert.slack.enable {
        channels.push(Arc::new(SlackChannel::new(&alert.slack, http.clone())?));
    }
    if alert.telegram.enable {
        channels.push(Arc::new(TelegramChannel::new(&alert.telegram, http.clone())?));
    }
    if alert.email.enable {
        channels.push(Arc::new(EmailChannel::new(&alert.email)?));
    }
    if alert.msteams.enable {
        channels.push(Arc::new(MsTeamsChannel::new(&alert.msteams, http.clone())?));
    }
    if alert.lark.enable {
        channels.push(Arc::new(LarkChannel::new(&alert.lark, http.clone())?));
    }

    Ok(channels)
}
