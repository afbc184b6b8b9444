//! PagerDuty Events API v2 paging provider.

use super::PagingError;
use crate::config::OnCallConfig;
use crate::core::PagingProvider;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

#[derive(Serialize, Debug)]
struct PagerDutyEvent<'a> {
    routing_key: &'a str,
    event_action: &'a str,
    payload: PagerDutyEventPayload<'a>,
}

#[derive(Serialize, Debug)]
struct PagerDutyEventPayload<'a> {
    summary: String,
    source: &'a str,
    severity: &'a str,
    custom_details: HashMap<&'a str, &'a str>,
}

/// Triggers PagerDuty incidents through the Events API v2.
pub struct PagerDutyProvider {
    client: reqwest::Client,
    routing_key: String,
    events_url: String,
    source: String,
}

impl PagerDutyProvider {
    /// Creates a new `PagerDutyProvider`.
    ///
    /// `source` is reported to PagerDuty as the event's origin.
    pub fn new(
        client: reqwest::Client,
        routing_key: String,
        events_url: String,
        source: String,
    ) -> Self {
        Self {
            client,
            routing_key,
            events_url,
            source,
        }
    }
}

#[async_trait]
impl PagingProvider for PagerDutyProvider {
    fn name(&self) -> &str {
        "pagerduty"
    }

    #[instrument(skip(self, overrides))]
    async fn trigger(
        &self,
        incident_id: &str,
        overrides: Option<&OnCallConfig>,
    ) -> Result<(), PagingError> {
        let routing_key = overrides
            .map(|c| c.pagerduty.routing_key.as_str())
            .filter(|key| !key.is_empty())
            .unwrap_or(&self.routing_key);

        let event = PagerDutyEvent {
            routing_key,
            event_action: "trigger",
            payload: PagerDutyEventPayload {
                summary: format!("Incident {}", incident_id),
                source: &self.source,
                severity: "critical",
                custom_details: HashMap::from([("incident_id", incident_id)]),
            },
        };

        let response = self.client.post(&self.events_url).json(&event).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PagingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("PagerDuty incident triggered.");
        Ok(())
    }
}
