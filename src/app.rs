//! The main application logic, decoupled from the entry point.

use crate::{
    channels::build_channels,
    config::Config,
    core::{ChannelProvider, EscalationStore, PagingProvider},
    internal_metrics::MetricsBuilder,
    oncall::{create_paging_provider, OnCallWorkflow},
    server::{self, AppState},
    services::{ChannelSource, IncidentService},
    store,
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, instrument};

/// Request timeout for every outbound HTTP call (channels and paging).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    local_addr: SocketAddr,
    router: Router,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the HTTP listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A clone of the application router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        shutdown_rx.changed().await.ok();
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;
        Ok(())
    }
}

/// Builder for the main application.
///
/// Every external collaborator can be replaced, which is how the integration
/// tests run without Redis, a paging service or chat APIs.
pub struct AppBuilder {
    config: Config,
    store_override: Option<Arc<dyn EscalationStore>>,
    pager_override: Option<Arc<dyn PagingProvider>>,
    channels_override: Option<Vec<Arc<dyn ChannelProvider>>>,
    metrics_override: Option<PrometheusHandle>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store_override: None,
            pager_override: None,
            channels_override: None,
            metrics_override: None,
        }
    }

    /// Overrides the escalation store.
    pub fn store_override(mut self, store: Arc<dyn EscalationStore>) -> Self {
        self.store_override = Some(store);
        self
    }

    /// Overrides the paging provider.
    pub fn pager_override(mut self, pager: Arc<dyn PagingProvider>) -> Self {
        self.pager_override = Some(pager);
        self
    }

    /// Overrides the notification channels. The list is used as-is for
    /// every request; channel settings in the configuration are ignored.
    pub fn channels_override(mut self, channels: Vec<Arc<dyn ChannelProvider>>) -> Self {
        self.channels_override = Some(channels);
        self
    }

    /// Overrides the Prometheus handle behind `/metrics`.
    pub fn metrics_override(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_override = Some(handle);
        self
    }

    /// Builds the on-call workflow when the configuration asks for it.
    async fn build_workflow(
        config: &Config,
        http: &reqwest::Client,
        store_override: Option<Arc<dyn EscalationStore>>,
        pager_override: Option<Arc<dyn PagingProvider>>,
    ) -> Result<Option<OnCallWorkflow>> {
        if !config.oncall.workflow_required() {
            info!("On-call escalation disabled.");
            return Ok(None);
        }

        let store = match store_override {
            Some(store) => store,
            None => store::connect(&config.store)
                .await
                .context("failed to connect to the escalation store")?,
        };

        let pager = match pager_override {
            Some(pager) => pager,
            None => create_paging_provider(config, http.clone())
                .await
                .context("failed to initialize the on-call provider")?,
        };

        info!(
            provider = pager.name(),
            wait_minutes = config.oncall.wait_minutes,
            enabled_by_default = config.oncall.enable,
            "On-call workflow initialized."
        );
        Ok(Some(OnCallWorkflow::new(store, pager)))
    }

    /// Builds all components, binds the listener and starts serving.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = Arc::new(self.config);
        let task_manager = TaskManager::new(shutdown_rx);

        let metrics = match self.metrics_override {
            Some(handle) => Some(handle),
            None => MetricsBuilder::new(config.metrics.clone()).build(),
        };

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        let workflow =
            Self::build_workflow(&config, &http, self.store_override, self.pager_override).await?;

        let channels = match self.channels_override {
            Some(channels) => ChannelSource::Fixed(channels),
            None => {
                // Channels are rebuilt per request; this only surfaces bad settings early.
                let enabled = build_channels(&config, &http)
                    .context("invalid notification channel configuration")?;
                let names: Vec<&str> = enabled.iter().map(|c| c.name()).collect();
                info!(channels = ?names, "Notification channels configured.");
                ChannelSource::Configured
            }
        };

        let service = IncidentService::new(config.clone(), http, channels, workflow);
        let router = server::router(AppState { service, metrics });

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener to {}", addr))?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "HTTP server listening.");

        let mut server_shutdown = task_manager.get_shutdown_rx();
        let server_router = router.clone();
        task_manager.spawn("HttpServer", async move {
            let result = axum::serve(listener, server_router)
                .with_graceful_shutdown(async move {
                    server_shutdown.changed().await.ok();
                })
                .await;
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        });

        Ok(App {
            task_manager,
            local_addr,
            router,
        })
    }
}
