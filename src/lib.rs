/// incidentd - incident fan-out and on-call escalation
///
/// Receives incidents over HTTP, notifies the configured chat and email
/// channels, and pages a human through an on-call provider when nobody
/// acknowledges the incident in time.
pub mod app;
pub mod channels;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod internal_metrics;
pub mod logging;
pub mod oncall;
pub mod server;
pub mod services;
pub mod store;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
