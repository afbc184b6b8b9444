#![allow(dead_code)]
use async_trait::async_trait;
use incidentd::channels::ChannelError;
use incidentd::core::{ChannelProvider, Incident};
use std::sync::{Arc, Mutex};

/// A channel that keeps every incident it was asked to deliver.
#[derive(Clone)]
pub struct RecordingChannel {
    name: &'static str,
    received: Arc<Mutex<Vec<Incident>>>,
}

impl RecordingChannel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn received(&self) -> Vec<Incident> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelProvider for RecordingChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn send_alert(&self, incident: &Incident) -> Result<(), ChannelError> {
        self.received.lock().unwrap().push(incident.clone());
        Ok(())
    }
}

/// A channel that always fails with a non-success status.
pub struct FailingChannel {
    name: &'static str,
}

impl FailingChannel {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl ChannelProvider for FailingChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn send_alert(&self, _incident: &Incident) -> Result<(), ChannelError> {
        Err(ChannelError::Status {
            channel: "failing",
            status: 502,
            body: "bad gateway".to_string(),
        })
    }
}
