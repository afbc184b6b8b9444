//! On-call escalation.
//!
//! The `OnCallWorkflow` decides, per incident, whether a human gets paged.
//! With a zero wait it pages right away. Otherwise it records the incident
//! as pending in the escalation store and schedules a one-shot check after
//! the wait window; the page only goes out if nobody acknowledged the
//! incident in the meantime.
//!
//! The store is the single source of truth. No cancellation handle is kept
//! for scheduled checks: an acknowledgment removes the record, and the check
//! turns into a no-op when it finds the record gone.

pub mod incident_manager;
pub mod pagerduty;

use crate::config::{Config, OnCallConfig, PagingProviderKind, ESCALATION_TTL_BUFFER};
use crate::core::{EscalationStore, PagingProvider};
use crate::store::StoreError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn, Instrument};

pub use incident_manager::IncidentManagerProvider;
pub use pagerduty::PagerDutyProvider;

/// Value stored for a pending escalation. Only the key's presence matters.
pub const PENDING_MARKER: &str = "pending";

#[derive(Error, Debug)]
pub enum PagingError {
    #[error("missing {0} configuration for the selected on-call provider")]
    MissingConfig(&'static str),

    #[error("paging request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("paging service returned non-success status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to start AWS incident: {0}")]
    Aws(String),
}

#[derive(Error, Debug)]
pub enum OnCallError {
    #[error("the on-call workflow hasn't been initialized")]
    Uninitialized,

    #[error("incident {0} does not exist or was already acknowledged")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Paging(#[from] PagingError),
}

/// What `start` did with an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The paging provider was invoked synchronously.
    Paged,
    /// A record was stored and a check scheduled after `wait`.
    Pending { wait: Duration },
}

/// The per-incident escalation state machine.
///
/// Cloning is cheap; every clone shares the same store and provider.
#[derive(Clone)]
pub struct OnCallWorkflow {
    store: Arc<dyn EscalationStore>,
    pager: Arc<dyn PagingProvider>,
}

impl OnCallWorkflow {
    /// Creates a new `OnCallWorkflow`.
    pub fn new(store: Arc<dyn EscalationStore>, pager: Arc<dyn PagingProvider>) -> Self {
        Self { store, pager }
    }

    /// Starts escalation for an incident.
    ///
    /// With a zero wait the page is sent before returning and any paging
    /// error is returned. Otherwise the incident is stored as pending with a
    /// TTL of `wait + 1 minute`, a check is scheduled after `wait`, and the
    /// call returns without waiting for it.
    #[instrument(
        skip(self, config),
        fields(wait_minutes = config.wait_minutes, provider = self.pager.name())
    )]
    pub async fn start(
        &self,
        incident_id: &str,
        config: &OnCallConfig,
    ) -> Result<StartOutcome, OnCallError> {
        let wait = config.wait();

        if wait.is_zero() {
            info!(incident_id, "No acknowledgment window, paging immediately.");
            if let Err(e) = self.pager.trigger(incident_id, Some(config)).await {
                error!(incident_id, error = %e, "Immediate escalation failed");
                metrics::counter!("escalation_failures_total", "path" => "immediate").increment(1);
                return Err(e.into());
            }
            metrics::counter!("escalations_total", "path" => "immediate").increment(1);
            return Ok(StartOutcome::Paged);
        }

        self.store
            .put(incident_id, PENDING_MARKER, wait + ESCALATION_TTL_BUFFER)
            .await?;
        info!(incident_id, wait_secs = wait.as_secs(), "Incident pending acknowledgment.");

        let workflow = self.clone();
        let incident_id = incident_id.to_string();
        let config = config.clone();
        let span = tracing::info_span!("escalation_check", incident_id = %incident_id);
        tokio::spawn(
            async move {
                tokio::time::sleep(wait).await;
                workflow.escalate_if_pending(&incident_id, &config).await;
            }
            .instrument(span),
        );

        Ok(StartOutcome::Pending { wait })
    }

    /// Acknowledges a pending incident, suppressing its scheduled page.
    ///
    /// Acknowledging an incident that is not pending (never escalated with a
    /// wait, already acknowledged, already paged or expired) fails with
    /// `OnCallError::NotFound`.
    #[instrument(skip(self))]
    pub async fn ack(&self, incident_id: &str) -> Result<(), OnCallError> {
        if !self.store.exists(incident_id).await? {
            metrics::counter!("acknowledgements_total", "outcome" => "not_found").increment(1);
            return Err(OnCallError::NotFound(incident_id.to_string()));
        }

        // The record can disappear between the two calls if the scheduled
        // check claims it first; that check then owns the page.
        if !self.store.delete(incident_id).await? {
            metrics::counter!("acknowledgements_total", "outcome" => "not_found").increment(1);
            return Err(OnCallError::NotFound(incident_id.to_string()));
        }

        info!(incident_id, "Incident acknowledged.");
        metrics::counter!("acknowledgements_total", "outcome" => "acknowledged").increment(1);
        Ok(())
    }

    /// The scheduled check. Runs once per pending incident, after the wait.
    async fn escalate_if_pending(&self, incident_id: &str, config: &OnCallConfig) {
        match self.store.exists(incident_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Incident was acknowledged before the deadline, nothing to do.");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to check incident in escalation store");
                return;
            }
        }

        // Claim the record; only the caller that removes it may page.
        match self.store.delete(incident_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Incident was acknowledged concurrently, nothing to do.");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to claim incident in escalation store");
                return;
            }
        }

        match self.pager.trigger(incident_id, Some(config)).await {
            Ok(()) => {
                info!(provider = self.pager.name(), "Incident escalated.");
                metrics::counter!("escalations_total", "path" => "deferred").increment(1);
            }
            Err(e) => {
                warn!(provider = self.pager.name(), error = %e, "Deferred escalation failed");
                metrics::counter!("escalation_failures_total", "path" => "deferred").increment(1);
            }
        }
    }
}

/// Builds the paging provider selected by `oncall.provider`.
///
/// A missing required field for the selected provider is an error; callers
/// treat it as fatal at startup.
pub async fn create_paging_provider(
    config: &Config,
    http: reqwest::Client,
) -> Result<Arc<dyn PagingProvider>, PagingError> {
    let oncall = &config.oncall;
    match oncall.provider {
        PagingProviderKind::AwsIncidentManager => {
            if oncall.aws_incident_manager.response_plan_arn.is_empty() {
                return Err(PagingError::MissingConfig("aws_incident_manager.response_plan_arn"));
            }
            let provider = IncidentManagerProvider::from_env(
                oncall.aws_incident_manager.response_plan_arn.clone(),
            )
            .await;
            Ok(Arc::new(provider))
        }
        PagingProviderKind::Pagerduty => {
            if oncall.pagerduty.routing_key.is_empty() {
                return Err(PagingError::MissingConfig("pagerduty.routing_key"));
            }
            Ok(Arc::new(PagerDutyProvider::new(
                http,
                oncall.pagerduty.routing_key.clone(),
                oncall.pagerduty.events_url.clone(),
                config.name.clone(),
            )))
        }
    }
}
