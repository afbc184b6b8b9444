use super::AppState;
use crate::core::Content;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info, warn};

pub async fn create_incident(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    handle_incident(&state, "", &params, &body).await
}

pub async fn create_team_incident(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    handle_incident(&state, &team_id, &params, &body).await
}

async fn handle_incident(
    state: &AppState,
    team_id: &str,
    params: &HashMap<String, String>,
    body: &[u8],
) -> Response {
    if state.service.config().alert.debug_body {
        info!(body = %String::from_utf8_lossy(body), "Raw request body");
    }

    let content: Content = match serde_json::from_slice(body) {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "Rejected incident with invalid body");
            return error_response(StatusCode::BAD_REQUEST, "Invalid input");
        }
    };

    match state
        .service
        .create_incident(team_id, &content, Some(params))
        .await
    {
        Ok(incident) => (
            StatusCode::CREATED,
            Json(json!({ "status": "Incident created", "id": incident.id })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to create incident");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

pub async fn acknowledge(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Response {
    match state.service.acknowledge(&incident_id).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "status": "success" }))).into_response(),
        Err(e) => {
            warn!(incident_id = %incident_id, error = %e, "Acknowledgment failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
