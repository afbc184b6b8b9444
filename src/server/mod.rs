//! HTTP API.
//!
//! - `POST /api/incidents` and `POST /api/incidents/teams/{team_id}` accept a
//!   JSON object and fan it out. Query parameters are per-request config
//!   overrides.
//! - `GET|POST /api/ack/{incident_id}` acknowledges a pending incident.
//! - `GET /healthz` and, when enabled, `GET /metrics`.

mod handlers;

use crate::services::IncidentService;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: IncidentService,
    pub metrics: Option<PrometheusHandle>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/incidents", post(handlers::create_incident))
        .route(
            "/api/incidents/teams/{team_id}",
            post(handlers::create_team_incident),
        )
        .route(
            "/api/ack/{incident_id}",
            get(handlers::acknowledge).post(handlers::acknowledge),
        )
        .layer(TraceLayer::new_for_http());

    let mut router = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(api);

    if let Some(handle) = state.metrics.clone() {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    router.with_state(state)
}
