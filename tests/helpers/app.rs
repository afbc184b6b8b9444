#![allow(dead_code)]
//! Test helpers for running the full application instance.

use super::mock_pager::RecordingPager;
use super::recording_store::RecordingStore;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use incidentd::app::App;
use incidentd::config::{Config, StoreBackend};
use incidentd::core::ChannelProvider;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub const PUBLIC_HOST: &str = "http://incidentd.test";

/// A running application plus handles to its fake collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: RecordingStore,
    pub pager: RecordingPager,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestApp {
    /// Sends a request through the router and returns the status and JSON body.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post_incident(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn ack(&self, incident_id: &str) -> (StatusCode, Value) {
        self.request(
            Request::post(format!("/api/ack/{}", incident_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn shutdown(self) {
        self.shutdown_tx.send(true).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

/// A builder for `TestApp` instances. Defaults: loopback listener on an
/// ephemeral port, in-memory store, recording pager, no channels.
pub struct TestAppBuilder {
    pub config: Config,
    channels: Vec<Arc<dyn ChannelProvider>>,
    pager: RecordingPager,
    store: RecordingStore,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.server.public_host = PUBLIC_HOST.to_string();
        config.store.backend = StoreBackend::Memory;

        Self {
            config,
            channels: Vec::new(),
            pager: RecordingPager::new(),
            store: RecordingStore::new(),
        }
    }

    /// Enables on-call escalation with the given acknowledgment window.
    pub fn with_oncall(mut self, wait_minutes: u64) -> Self {
        self.config.oncall.enable = true;
        self.config.oncall.wait_minutes = wait_minutes;
        self
    }

    /// Initializes the workflow without enabling escalation by default.
    pub fn with_oncall_initialized_only(mut self) -> Self {
        self.config.oncall.initialized_only = true;
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn ChannelProvider>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_pager(mut self, pager: RecordingPager) -> Self {
        self.pager = pager;
        self
    }

    pub async fn start(self) -> TestApp {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = App::builder(self.config)
            .store_override(Arc::new(self.store.clone()))
            .pager_override(Arc::new(self.pager.clone()))
            .channels_override(self.channels)
            .build(shutdown_rx)
            .await
            .expect("failed to build test app");

        let router = app.router();
        let handle = tokio::spawn(app.run());

        TestApp {
            router,
            store: self.store,
            pager: self.pager,
            shutdown_tx,
            handle,
        }
    }
}
