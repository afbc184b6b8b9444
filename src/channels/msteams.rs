//! Microsoft Teams channel.
//!
//! Legacy Office 365 connector webhooks (`*.webhook.office.com`) accept a
//! plain `{"text": ...}` body. Power Automate flows receive the rendered
//! message as `messageText` next to the incident's own fields, so the flow
//! can build its own card.

use super::{require, ChannelError, TemplateRenderer};
use crate::config::MsTeamsConfig;
use crate::core::{ChannelProvider, Incident};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

pub struct MsTeamsChannel {
    client: reqwest::Client,
    url: String,
    renderer: TemplateRenderer,
}

impl MsTeamsChannel {
    pub fn new(config: &MsTeamsConfig, client: reqwest::Client) -> Result<Self, ChannelError> {
        require("msteams", "power_automate_url", &config.power_automate_url)?;
        require("msteams", "template_path", &config.template_path)?;
        let renderer = TemplateRenderer::from_file(&config.template_path, false)?;
        Ok(Self::with_renderer(config, client, renderer))
    }

    pub fn with_renderer(
        config: &MsTeamsConfig,
        client: reqwest::Client,
        renderer: TemplateRenderer,
    ) -> Self {
        Self {
            client,
            url: config.power_automate_url.clone(),
            renderer,
        }
    }

    fn is_legacy_webhook(&self) -> bool {
        self.url.contains("webhook.office.com")
    }

    fn build_payload(&self, incident: &Incident) -> Result<Value, ChannelError> {
        let text = self.renderer.render(&incident.content)?;
        if self.is_legacy_webhook() {
            return Ok(json!({ "text": text }));
        }

        let mut payload = incident.content.clone();
        payload.insert("messageText".to_string(), Value::String(text));
        Ok(Value::Object(payload))
    }
}

#[async_trait]
impl ChannelProvider for MsTeamsChannel {
    fn name(&self) -> &str {
        "msteams"
    }

    #[instrument(skip_all, fields(incident_id = %incident.id))]
    async fn send_alert(&self, incident: &Incident) -> Result<(), ChannelError> {
        let payload = self.build_payload(incident)?;
        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                channel: "msteams",
                status: status.as_u16(),
                body,
            });
        }

        debug!("Teams message sent.");
        Ok(())
    }
}
