//! AWS Systems Manager Incident Manager paging provider.

use super::PagingError;
use crate::config::OnCallConfig;
use crate::core::PagingProvider;
use async_trait::async_trait;
use aws_sdk_ssmincidents::error::DisplayErrorContext;
use aws_sdk_ssmincidents::Client;
use tracing::{info, instrument};

/// Starts incidents from a response plan, which in turn engages the
/// plan's on-call contacts.
pub struct IncidentManagerProvider {
    client: Client,
    response_plan_arn: String,
}

impl IncidentManagerProvider {
    pub fn new(client: Client, response_plan_arn: String) -> Self {
        Self {
            client,
            response_plan_arn,
        }
    }

    /// Builds a client from the ambient AWS configuration (environment,
    /// shared profile, instance metadata).
    pub async fn from_env(response_plan_arn: String) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), response_plan_arn)
    }

    fn response_plan_for<'a>(&'a self, overrides: Option<&'a OnCallConfig>) -> &'a str {
        overrides
            .map(|c| c.aws_incident_manager.response_plan_arn.as_str())
            .filter(|arn| !arn.is_empty())
            .unwrap_or(&self.response_plan_arn)
    }
}

/// Title given to incidents started in Incident Manager.
pub fn incident_title(incident_id: &str) -> String {
    format!("Incident id {}", incident_id)
}

#[async_trait]
impl PagingProvider for IncidentManagerProvider {
    fn name(&self) -> &str {
        "aws_incident_manager"
    }

    #[instrument(skip(self, overrides))]
    async fn trigger(
        &self,
        incident_id: &str,
        overrides: Option<&OnCallConfig>,
    ) -> Result<(), PagingError> {
        let title = incident_title(incident_id);

        self.client
            .start_incident()
            .response_plan_arn(self.response_plan_for(overrides))
            .title(&title)
            .send()
            .await
            .map_err(|e| PagingError::Aws(DisplayErrorContext(&e).to_string()))?;

        info!(title = %title, "AWS incident started.");
        Ok(())
    }
}
