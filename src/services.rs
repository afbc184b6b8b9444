//! Incident orchestration: overrides, notification fan-out and escalation.

use crate::channels::{build_channels, ChannelError};
use crate::config::Config;
use crate::core::{ChannelProvider, Content, Incident, ACK_URL_KEY};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::oncall::{OnCallError, OnCallWorkflow};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum IncidentError {
    #[error("failed to create channels: {0}")]
    Channels(#[from] ChannelError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    OnCall(#[from] OnCallError),
}

/// Where the notification channels for a request come from.
#[derive(Clone)]
pub enum ChannelSource {
    /// Built from the (per-request) configuration on every incident.
    Configured,
    /// A fixed list, regardless of configuration.
    Fixed(Vec<Arc<dyn ChannelProvider>>),
}

/// Handles incoming incidents and acknowledgments.
#[derive(Clone)]
pub struct IncidentService {
    config: Arc<Config>,
    http: reqwest::Client,
    channels: ChannelSource,
    workflow: Option<OnCallWorkflow>,
}

impl IncidentService {
    pub fn new(
        config: Arc<Config>,
        http: reqwest::Client,
        channels: ChannelSource,
        workflow: Option<OnCallWorkflow>,
    ) -> Self {
        Self {
            config,
            http,
            channels,
            workflow,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates an incident from `content` and notifies every enabled channel.
    ///
    /// `params` are per-request configuration overrides. When on-call is
    /// enabled for the request and the incident is not resolved, the
    /// acknowledgment URL is added to the incident's copy of the content
    /// before dispatch and escalation starts after a successful dispatch.
    #[instrument(skip_all, fields(team_id = %team_id))]
    pub async fn create_incident(
        &self,
        team_id: &str,
        content: &Content,
        params: Option<&HashMap<String, String>>,
    ) -> Result<Incident, IncidentError> {
        metrics::counter!("incidents_received_total").increment(1);

        let config: Cow<'_, Config> = match params {
            Some(params) if !params.is_empty() => Cow::Owned(self.config.with_overrides(params)),
            _ => Cow::Borrowed(self.config.as_ref()),
        };

        let dispatcher = Dispatcher::new(match &self.channels {
            ChannelSource::Configured => build_channels(&config, &self.http)?,
            ChannelSource::Fixed(channels) => channels.clone(),
        });

        let mut incident = Incident::new(team_id, content.clone());
        let escalate = !incident.resolved && config.oncall.enable;

        if escalate {
            incident.content.insert(
                ACK_URL_KEY.to_string(),
                Value::String(config.ack_url(&incident.id)),
            );
        }

        dispatcher.dispatch(&incident).await?;
        info!(incident_id = %incident.id, resolved = incident.resolved, "Incident dispatched.");

        if escalate {
            let workflow = self.workflow.as_ref().ok_or(OnCallError::Uninitialized)?;
            workflow.start(&incident.id, &config.oncall).await?;
        }

        Ok(incident)
    }

    /// Acknowledges a pending incident.
    pub async fn acknowledge(&self, incident_id: &str) -> Result<(), OnCallError> {
        self.workflow
            .as_ref()
            .ok_or(OnCallError::Uninitialized)?
            .ack(incident_id)
            .await
    }
}
