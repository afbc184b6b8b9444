//! Fan-out of an incident to the configured notification channels.

use crate::channels::ChannelError;
use crate::core::{ChannelProvider, Incident};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// The first channel that failed to deliver an incident.
#[derive(Error, Debug)]
#[error("failed to send alert via {channel}: {source}")]
pub struct DispatchError {
    pub channel: String,
    #[source]
    pub source: ChannelError,
}

/// Sends an incident to an ordered list of channels.
///
/// Delivery is sequential and fail-fast: the first failing channel aborts the
/// dispatch, and the channels after it are not attempted.
pub struct Dispatcher {
    channels: Vec<Arc<dyn ChannelProvider>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn ChannelProvider>>) -> Self {
        Self { channels }
    }

    #[instrument(skip_all, fields(incident_id = %incident.id, channels = self.channels.len()))]
    pub async fn dispatch(&self, incident: &Incident) -> Result<(), DispatchError> {
        if self.channels.is_empty() {
            debug!("No notification channels enabled.");
            return Ok(());
        }

        for channel in &self.channels {
            let name = channel.name().to_string();
            if let Err(source) = channel.send_alert(incident).await {
                error!(channel = %name, error = %source, "Failed to send alert");
                metrics::counter!("notifications_failed_total", "channel" => name.clone())
                    .increment(1);
                return Err(DispatchError {
                    channel: name,
                    source,
                });
            }
            metrics::counter!("notifications_sent_total", "channel" => name).increment(1);
        }
        Ok(())
    }
}
