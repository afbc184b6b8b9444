//! # Internal Metrics Module
//!
//! Counters for the incident pipeline, exported in Prometheus format on the
//! main listener's `/metrics` route.
//!
//! Call sites record through the `metrics` macros directly. This module only
//! installs the Prometheus recorder and registers metric descriptions.

use crate::config::MetricsConfig;
use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{error, info};

/// Registers descriptions for every metric the service records.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "incidents_received_total",
        Unit::Count,
        "Total number of incidents received over HTTP."
    );
    metrics::describe_counter!(
        "notifications_sent_total",
        Unit::Count,
        "Total number of notifications delivered, labeled by channel."
    );
    metrics::describe_counter!(
        "notifications_failed_total",
        Unit::Count,
        "Total number of failed notification deliveries, labeled by channel."
    );
    metrics::describe_counter!(
        "escalations_total",
        Unit::Count,
        "Total number of pages sent, labeled by path (immediate or deferred)."
    );
    metrics::describe_counter!(
        "escalation_failures_total",
        Unit::Count,
        "Total number of failed pages, labeled by path."
    );
    metrics::describe_counter!(
        "acknowledgements_total",
        Unit::Count,
        "Total number of acknowledgment attempts, labeled by outcome."
    );
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the Prometheus recorder and returns the handle used to render
    /// the `/metrics` response.
    ///
    /// Returns `None` when metrics are disabled or a global recorder is
    /// already installed.
    pub fn build(self) -> Option<PrometheusHandle> {
        if !self.config.enabled {
            return None;
        }

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return None;
        }

        describe_metrics();
        info!("Prometheus metrics enabled on /metrics.");
        Some(handle)
    }
}
