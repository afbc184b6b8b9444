#![allow(dead_code)]
use async_trait::async_trait;
use incidentd::config::OnCallConfig;
use incidentd::core::PagingProvider;
use incidentd::oncall::PagingError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A paging provider that records every page instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingPager {
    pages: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingPager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pager whose every trigger fails with a 500.
    pub fn failing() -> Self {
        let pager = Self::default();
        pager.fail.store(true, Ordering::SeqCst);
        pager
    }

    /// Incident ids paged so far, in order.
    pub fn pages(&self) -> Vec<String> {
        self.pages.lock().unwrap().clone()
    }

    pub fn count_for(&self, incident_id: &str) -> usize {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == incident_id)
            .count()
    }
}

#[async_trait]
impl PagingProvider for RecordingPager {
    fn name(&self) -> &str {
        "recording_pager"
    }

    async fn trigger(
        &self,
        incident_id: &str,
        _overrides: Option<&OnCallConfig>,
    ) -> Result<(), PagingError> {
        self.pages.lock().unwrap().push(incident_id.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PagingError::Status {
                status: 500,
                body: "pager down".to_string(),
            });
        }
        Ok(())
    }
}
