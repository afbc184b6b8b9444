//! Telegram channel, delivered through the Bot API.

use super::{require, ChannelError, TemplateRenderer};
use crate::config::TelegramConfig;
use crate::core::{ChannelProvider, Incident};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Serialize, Debug)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'a str,
}

pub struct TelegramChannel {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    api_url: String,
    renderer: TemplateRenderer,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig, client: reqwest::Client) -> Result<Self, ChannelError> {
        require("telegram", "bot_token", &config.bot_token)?;
        require("telegram", "chat_id", &config.chat_id)?;
        require("telegram", "template_path", &config.template_path)?;
        // Messages are sent with HTML parse mode, so values get escaped.
        let renderer = TemplateRenderer::from_file(&config.template_path, true)?;
        Ok(Self::with_renderer(config, client, renderer))
    }

    pub fn with_renderer(
        config: &TelegramConfig,
        client: reqwest::Client,
        renderer: TemplateRenderer,
    ) -> Self {
        Self {
            client,
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            renderer,
        }
    }
}

#[async_trait]
impl ChannelProvider for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    #[instrument(skip_all, fields(incident_id = %incident.id))]
    async fn send_alert(&self, incident: &Incident) -> Result<(), ChannelError> {
        let message = TelegramMessage {
            chat_id: &self.chat_id,
            text: self.renderer.render(&incident.content)?,
            parse_mode: "HTML",
        };

        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let response = self.client.post(url).json(&message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                channel: "telegram",
                status: status.as_u16(),
                body,
            });
        }

        debug!("Telegram message sent.");
        Ok(())
    }
}
