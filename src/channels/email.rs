//! Email channel, sent over SMTP.

use super::{require, ChannelError, TemplateRenderer};
use crate::config::EmailConfig;
use crate::core::{ChannelProvider, Incident};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, instrument};

/// Port on which the server expects TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct EmailChannel {
    config: EmailConfig,
    renderer: TemplateRenderer,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self, ChannelError> {
        require("email", "smtp_host", &config.smtp_host)?;
        require("email", "username", &config.username)?;
        require("email", "to", &config.to)?;
        require("email", "template_path", &config.template_path)?;
        let renderer = TemplateRenderer::from_file(&config.template_path, true)?;
        Ok(Self::with_renderer(config, renderer))
    }

    pub fn with_renderer(config: &EmailConfig, renderer: TemplateRenderer) -> Self {
        Self {
            config: config.clone(),
            renderer,
        }
    }

    /// Builds the HTML message for an incident.
    fn build_message(&self, incident: &Incident) -> Result<Message, ChannelError> {
        let body = self.renderer.render(&incident.content)?;

        let from: Mailbox = self
            .config
            .username
            .parse()
            .map_err(|e| ChannelError::Email(format!("invalid sender address: {}", e)))?;

        let recipients = parse_recipients(&self.config.to)?;

        let mut builder = Message::builder().from(from).subject(&self.config.subject);
        for recipient in recipients {
            builder = builder.to(recipient);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| ChannelError::Email(format!("failed to build message: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
        let host = &self.config.smtp_host;
        let builder = if self.config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| ChannelError::Email(format!("failed to create SMTP transport: {}", e)))?;

        let credentials =
            Credentials::new(self.config.username.clone(), self.config.password.clone());

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build())
    }
}

/// Parses a comma-separated recipient list, skipping blank entries.
pub fn parse_recipients(to: &str) -> Result<Vec<Mailbox>, ChannelError> {
    let recipients = to
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| {
            r.parse::<Mailbox>()
                .map_err(|e| ChannelError::Email(format!("invalid recipient {:?}: {}", r, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(ChannelError::Email("no valid email recipients found".to_string()));
    }
    Ok(recipients)
}

#[async_trait]
impl ChannelProvider for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip_all, fields(incident_id = %incident.id, to = %self.config.to))]
    async fn send_alert(&self, incident: &Incident) -> Result<(), ChannelError> {
        let message = self.build_message(incident)?;
        self.transport()?
            .send(message)
            .await
            .map_err(|e| ChannelError::Email(e.to_string()))?;

        debug!("Email sent.");
        Ok(())
    }
}
