//! Slack channel, delivered through the Web API `chat.postMessage` method.

use super::{require, ChannelError, TemplateRenderer};
use crate::config::{SlackConfig, SlackMessageProperties};
use crate::core::{ChannelProvider, Content, Incident, ACK_URL_KEY};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

const RESOLVED_COLOR: &str = "#36A64F";
const UNRESOLVED_COLOR: &str = "#C70039";
const DEFAULT_BUTTON_TEXT: &str = "Acknowledge Alert";
const DEFAULT_BUTTON_STYLE: &str = "primary";

#[derive(Deserialize, Debug)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts incidents to a Slack channel as colored attachments, optionally
/// with an acknowledge button.
pub struct SlackChannel {
    client: reqwest::Client,
    token: String,
    channel_id: String,
    api_url: String,
    properties: SlackMessageProperties,
    renderer: TemplateRenderer,
}

impl SlackChannel {
    pub fn new(config: &SlackConfig, client: reqwest::Client) -> Result<Self, ChannelError> {
        require("slack", "token", &config.token)?;
        require("slack", "channel_id", &config.channel_id)?;
        require("slack", "template_path", &config.template_path)?;
        let renderer = TemplateRenderer::from_file(&config.template_path, false)?;
        Ok(Self::with_renderer(config, client, renderer))
    }

    pub fn with_renderer(
        config: &SlackConfig,
        client: reqwest::Client,
        renderer: TemplateRenderer,
    ) -> Self {
        Self {
            client,
            token: config.token.clone(),
            channel_id: config.channel_id.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            properties: config.message_properties.clone(),
            renderer,
        }
    }

    /// Builds the `chat.postMessage` payload for an incident.
    fn build_payload(&self, incident: &Incident) -> Result<Value, ChannelError> {
        if incident.resolved {
            let text = self.renderer.render(&incident.content)?;
            return Ok(self.standard_message(&text, RESOLVED_COLOR));
        }

        let ack_url = incident.ack_url().map(str::to_string);
        match ack_url {
            Some(url) if self.properties.use_button_ack => {
                // The link moves into the button, so hide it from the template.
                let mut content: Content = incident.content.clone();
                content.remove(ACK_URL_KEY);
                let text = self.renderer.render(&content)?;
                Ok(self.button_message(&text, &url, &incident.id))
            }
            _ => {
                let text = self.renderer.render(&incident.content)?;
                Ok(self.standard_message(&text, UNRESOLVED_COLOR))
            }
        }
    }

    fn standard_message(&self, text: &str, color: &str) -> Value {
        json!({
            "channel": self.channel_id,
            "attachments": [{ "text": text, "color": color }],
        })
    }

    fn button_message(&self, text: &str, ack_url: &str, incident_id: &str) -> Value {
        let button_text = non_empty(&self.properties.button_text).unwrap_or(DEFAULT_BUTTON_TEXT);
        let style = non_empty(&self.properties.button_style).unwrap_or(DEFAULT_BUTTON_STYLE);

        json!({
            "channel": self.channel_id,
            "attachments": [{
                "color": UNRESOLVED_COLOR,
                "blocks": [
                    {
                        "type": "section",
                        "text": { "type": "mrkdwn", "text": text },
                    },
                    {
                        "type": "actions",
                        "block_id": "incident_actions",
                        "elements": [{
                            "type": "button",
                            "action_id": "ack_incident",
                            "value": incident_id,
                            "text": { "type": "plain_text", "text": button_text },
                            "url": ack_url,
                            "style": style,
                        }],
                    },
                ],
            }],
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.is_empty())
}

#[async_trait]
impl ChannelProvider for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    #[instrument(skip_all, fields(incident_id = %incident.id, channel_id = %self.channel_id))]
    async fn send_alert(&self, incident: &Incident) -> Result<(), ChannelError> {
        let payload = self.build_payload(incident)?;

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                channel: "slack",
                status: status.as_u16(),
                body,
            });
        }

        // Slack reports most failures with a 200 and `ok: false`.
        let body: SlackResponse = response.json().await?;
        if !body.ok {
            return Err(ChannelError::Rejected {
                channel: "slack",
                message: body.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        debug!("Slack message posted.");
        Ok(())
    }
}
