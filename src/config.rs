//! Configuration management for incidentd
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer defaults, an `incidentd.toml` file, environment variables
//! and command-line arguments.

use crate::cli::Cli;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/incidentd.toml";

/// Extra time an escalation record outlives its wait window.
pub const ESCALATION_TTL_BUFFER: Duration = Duration::from_secs(60);

/// Longest accepted acknowledgment window (30 days).
pub const MAX_WAIT_MINUTES: u64 = 30 * 24 * 60;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Service name, reported as the source of pages.
    pub name: String,
    /// The logging level (an `EnvFilter` directive).
    pub log_level: String,
    /// The format of log lines.
    pub log_format: LogFormat,
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Notification channels.
    pub alert: AlertConfig,
    /// On-call escalation.
    pub oncall: OnCallConfig,
    /// Backing store for pending escalations.
    pub store: StoreConfig,
    /// Prometheus metrics.
    pub metrics: MetricsConfig,
}

/// The format of log lines written to stdout.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// HTTP listener settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Externally reachable base URL, used to build acknowledgment links.
    pub public_host: String,
}

/// Configuration for all notification channels.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AlertConfig {
    /// Log raw request bodies of incoming incidents.
    pub debug_body: bool,
    pub slack: SlackConfig,
    pub telegram: TelegramConfig,
    pub email: EmailConfig,
    pub msteams: MsTeamsConfig,
    pub lark: LarkConfig,
}

/// Slack Web API channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SlackConfig {
    pub enable: bool,
    /// Bot token used for `chat.postMessage`.
    pub token: String,
    pub channel_id: String,
    pub template_path: String,
    /// Base URL of the Slack Web API.
    pub api_url: String,
    pub message_properties: SlackMessageProperties,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enable: false,
            token: String::new(),
            channel_id: String::new(),
            template_path: String::new(),
            api_url: "https://slack.com/api".to_string(),
            message_properties: SlackMessageProperties::default(),
        }
    }
}

/// Presentation of the Slack acknowledge button.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SlackMessageProperties {
    /// Render the acknowledgment link as an interactive button.
    pub use_button_ack: bool,
    pub button_text: String,
    /// `primary` or `danger`.
    pub button_style: String,
}

/// Telegram Bot API channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TelegramConfig {
    pub enable: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub template_path: String,
    /// Base URL of the Bot API.
    pub api_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enable: false,
            bot_token: String::new(),
            chat_id: String::new(),
            template_path: String::new(),
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

/// SMTP email channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    pub enable: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Comma-separated list of recipients.
    pub to: String,
    pub subject: String,
    pub template_path: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enable: false,
            smtp_host: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            to: String::new(),
            subject: "Incident alert".to_string(),
            template_path: String::new(),
        }
    }
}

/// Microsoft Teams channel, delivered through a Power Automate workflow URL.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MsTeamsConfig {
    pub enable: bool,
    pub power_automate_url: String,
    pub template_path: String,
    /// Named alternative URLs, selectable per request.
    pub other_power_urls: HashMap<String, String>,
}

/// Lark custom bot channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LarkConfig {
    pub enable: bool,
    pub webhook_url: String,
    pub template_path: String,
}

/// Which paging service escalations go to.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PagingProviderKind {
    #[default]
    AwsIncidentManager,
    Pagerduty,
}

/// On-call escalation settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct OnCallConfig {
    /// Escalate unresolved incidents.
    pub enable: bool,
    /// Initialize the workflow (store and paging provider) even when
    /// escalation is off by default, so requests can opt in.
    pub initialized_only: bool,
    /// Minutes to wait for an acknowledgment. Zero pages immediately.
    pub wait_minutes: u64,
    pub provider: PagingProviderKind,
    pub aws_incident_manager: AwsIncidentManagerConfig,
    pub pagerduty: PagerDutyConfig,
}

impl OnCallConfig {
    /// The acknowledgment window.
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_minutes.saturating_mul(60))
    }

    /// Whether the workflow has to be constructed at startup.
    pub fn workflow_required(&self) -> bool {
        self.enable || self.initialized_only
    }
}

/// AWS Systems Manager Incident Manager settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AwsIncidentManagerConfig {
    pub response_plan_arn: String,
}

/// PagerDuty Events API v2 settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PagerDutyConfig {
    pub routing_key: String,
    /// Events API endpoint.
    pub events_url: String,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            routing_key: String::new(),
            events_url: "https://events.pagerduty.com/v2/enqueue".to_string(),
        }
    }
}

/// The escalation store implementation.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local; pending escalations are lost on restart.
    Memory,
}

/// Escalation store settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis: RedisConfig,
}

/// Redis connection settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    /// Connect over TLS.
    pub tls: bool,
    /// Skip certificate verification when using TLS.
    pub insecure_skip_verify: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            tls: false,
            insecure_skip_verify: false,
        }
    }
}

/// Prometheus metrics settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose `/metrics` on the main listener.
    pub enabled: bool,
}

impl Config {
    /// Loads the application configuration by layering defaults, the TOML
    /// file named on the command line (or the default path), environment
    /// variables and CLI arguments.
    ///
    /// Environment variables use the `INCIDENTD_` prefix with `__` between
    /// levels, e.g. `INCIDENTD_ONCALL__WAIT_MINUTES=5`.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("INCIDENTD_").split("__"))
            .merge(cli.clone())
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that cannot be used as configured.
    fn validate(&self) -> Result<()> {
        if self.oncall.wait_minutes > MAX_WAIT_MINUTES {
            anyhow::bail!(
                "oncall.wait_minutes must be at most {} (got {})",
                MAX_WAIT_MINUTES,
                self.oncall.wait_minutes
            );
        }
        Ok(())
    }

    /// Returns a copy of this configuration with per-request overrides
    /// applied. Unknown keys and unparsable values are ignored.
    pub fn with_overrides(&self, params: &HashMap<String, String>) -> Config {
        let mut cfg = self.clone();
        let param = |key: &str| params.get(key).map(String::as_str).filter(|v| !v.is_empty());

        if let Some(v) = param("slack_channel_id") {
            cfg.alert.slack.channel_id = v.to_string();
        }
        if let Some(v) = param("email_to") {
            cfg.alert.email.to = v.to_string();
        }
        if let Some(v) = param("email_subject") {
            cfg.alert.email.subject = v.to_string();
        }
        if let Some(v) = param("msteams_other_power_url") {
            if let Some(url) = cfg.alert.msteams.other_power_urls.get(v).filter(|u| !u.is_empty()) {
                cfg.alert.msteams.power_automate_url = url.clone();
            }
        }
        if let Some(v) = param("oncall_enable") {
            if let Some(enable) = parse_bool(v) {
                cfg.oncall.enable = enable;
            }
        }
        if let Some(v) = param("oncall_wait_minutes") {
            // Fractional minutes truncate toward zero; out-of-range values are ignored.
            if let Ok(minutes) = v.parse::<f64>() {
                if minutes.is_finite() && (0.0..=MAX_WAIT_MINUTES as f64).contains(&minutes) {
                    cfg.oncall.wait_minutes = minutes.trunc() as u64;
                }
            }
        }
        if let Some(v) = param("awsim_response_plan_arn") {
            cfg.oncall.aws_incident_manager.response_plan_arn = v.to_string();
        }
        if let Some(v) = param("pagerduty_routing_key") {
            cfg.oncall.pagerduty.routing_key = v.to_string();
        }
        cfg
    }

    /// The acknowledgment URL for an incident.
    pub fn ack_url(&self, incident_id: &str) -> String {
        format!(
            "{}/api/ack/{}",
            self.server.public_host.trim_end_matches('/'),
            incident_id
        )
    }
}

/// Parses the boolean spellings accepted in query parameters: `1`, `t`,
/// `T`, `TRUE`, `true`, `True` and their false counterparts.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            name: "incidentd".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_host: "http://localhost:3000".to_string(),
            },
            alert: AlertConfig::default(),
            oncall: OnCallConfig::default(),
            store: StoreConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
