//! Core domain types and service traits for incidentd
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions throughout the application.

use crate::channels::ChannelError;
use crate::config::OnCallConfig;
use crate::oncall::PagingError;
use crate::store::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

/// The free-form payload of an incident, as received from the caller.
pub type Content = Map<String, Value>;

/// Content key under which the acknowledgment link is injected.
pub const ACK_URL_KEY: &str = "AckURL";

/// Fields inspected, in priority order, to decide whether a payload reports
/// a resolved incident. Names are compared case-insensitively.
const STATUS_FIELDS: &[&str] = &["status", "state", "alertState", "alert_state"];

/// One occurrence of an alert that requires human attention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    /// Globally unique identifier (UUIDv4)
    pub id: String,
    /// Team the incident was reported for; empty when not team-scoped
    pub team_id: String,
    /// The (possibly enriched) payload handed to the channel templates
    pub content: Content,
    /// Whether the payload reports that the incident is already resolved
    pub resolved: bool,
}

impl Incident {
    /// Creates a new incident with a fresh identifier. The resolved flag is
    /// derived from the content.
    pub fn new(team_id: impl Into<String>, content: Content) -> Self {
        let resolved = is_resolved(&content);
        Self {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.into(),
            content,
            resolved,
        }
    }

    /// Returns the injected acknowledgment URL, if any.
    pub fn ack_url(&self) -> Option<&str> {
        self.content.get(ACK_URL_KEY).and_then(Value::as_str)
    }
}

/// Checks whether an incident payload reports a resolved state.
///
/// The first status-like field holding a string decides. Payloads without
/// such a field are treated as unresolved, so they stay eligible for
/// escalation.
pub fn is_resolved(content: &Content) -> bool {
    for field in STATUS_FIELDS {
        let value = content
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field))
            .and_then(|(_, value)| value.as_str());

        if let Some(status) = value {
            return status.eq_ignore_ascii_case("resolved");
        }
    }
    false
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers incidents to a single notification channel (chat, email, ...)
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// A short, unique name for the channel (e.g., "slack", "email").
    /// Used for logging, metrics and error context.
    fn name(&self) -> &str;

    /// Renders and delivers an incident
    ///
    /// # Arguments
    /// * `incident` - The incident to deliver
    ///
    /// # Returns
    /// * `Ok(())` if the channel accepted the message
    /// * `Err` if rendering or delivery failed
    async fn send_alert(&self, incident: &Incident) -> Result<(), ChannelError>;
}

/// Escalates an incident to a human through an external paging service
#[async_trait]
pub trait PagingProvider: Send + Sync {
    /// A short name for the paging service, used for logging and metrics.
    fn name(&self) -> &str;

    /// Triggers a page for the incident
    ///
    /// Calling this more than once for the same incident is allowed and
    /// results in duplicate pages; providers do not deduplicate.
    ///
    /// # Arguments
    /// * `incident_id` - The incident to page for
    /// * `overrides` - Per-request on-call settings. Non-empty routing
    ///   values replace the provider's configured target.
    async fn trigger(
        &self,
        incident_id: &str,
        overrides: Option<&OnCallConfig>,
    ) -> Result<(), PagingError>;
}

/// Shared key/value store with per-key expiry holding pending escalations
///
/// Every operation is atomic per key, so implementations can be used from
/// many tasks (and many processes) without additional locking.
#[async_trait]
pub trait EscalationStore: Send + Sync {
    /// Stores `marker` under `key`, expiring it after `ttl`.
    async fn put(&self, key: &str, marker: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Returns whether `key` is currently present.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Removes `key`. Returns `true` only for the call that actually removed
    /// it; deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Verifies that the backing service is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
