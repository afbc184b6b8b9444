//! Lark (Feishu) custom bot channel.

use super::{require, ChannelError, TemplateRenderer};
use crate::config::LarkConfig;
use crate::core::{ChannelProvider, Incident};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

pub struct LarkChannel {
    client: reqwest::Client,
    webhook_url: String,
    renderer: TemplateRenderer,
}

impl LarkChannel {
    pub fn new(config: &LarkConfig, client: reqwest::Client) -> Result<Self, ChannelError> {
        require("lark", "webhook_url", &config.webhook_url)?;
        require("lark", "template_path", &config.template_path)?;
        let renderer = TemplateRenderer::from_file(&config.template_path, false)?;
        Ok(Self::with_renderer(config, client, renderer))
    }

    pub fn with_renderer(
        config: &LarkConfig,
        client: reqwest::Client,
        renderer: TemplateRenderer,
    ) -> Self {
        Self {
            client,
            webhook_url: config.webhook_url.clone(),
            renderer,
        }
    }
}

/// Converts rendered text into a Lark `post` message.
///
/// The first non-empty line becomes the title (heading markers stripped),
/// prefixed with a red or green marker depending on `resolved`. Every other
/// line becomes its own paragraph.
pub fn post_message(text: &str, resolved: bool) -> Value {
    let marker = if resolved { "🟢" } else { "🔴" };
    let mut title: Option<String> = None;
    let mut paragraphs: Vec<Value> = Vec::new();

    for line in text.lines() {
        if title.is_none() {
            let heading = line.trim().trim_start_matches('#').trim();
            if !heading.is_empty() {
                title = Some(heading.to_string());
            }
            continue;
        }

        let line = if line.trim().is_empty() { " " } else { line };
        paragraphs.push(json!([{ "tag": "text", "text": line, "un_escape": true }]));
    }

    let title = match title {
        Some(title) => format!("{} {}", marker, title),
        None if resolved => format!("{} Incident Resolved", marker),
        None => format!("{} Incident Alert", marker),
    };

    json!({
        "msg_type": "post",
        "content": {
            "post": {
                "en_us": { "title": title, "content": paragraphs }
            }
        }
    })
}

#[async_trait]
impl ChannelProvider for LarkChannel {
    fn name(&self) -> &str {
        "lark"
    }

    #[instrument(skip_all, fields(incident_id = %incident.id))]
    async fn send_alert(&self, incident: &Incident) -> Result<(), ChannelError> {
        let text = self.renderer.render(&incident.content)?;
        let payload = post_message(&text, incident.resolved);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                channel: "lark",
                status: status.as_u16(),
                body,
            });
        }

        debug!("Lark message sent.");
        Ok(())
    }
}
