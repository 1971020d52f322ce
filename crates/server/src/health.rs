use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum HealthState {
    /// Indicates that the server is healthy and operational.
    Healthy,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: HealthState,
    /// RFC 3339 time the check was answered.
    timestamp: String,
    server: String,
}

/// Handles health check requests and returns the current health status of the server.
pub(crate) async fn health(label: String) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthState::Healthy,
        timestamp: jiff::Timestamp::now().to_string(),
        server: label,
    })
}
