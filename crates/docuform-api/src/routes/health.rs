//! Liveness and readiness reporting.

use axum::Json;
use axum::extract::State;
use docuform_core::ServiceState;
use docuform_core::service::ServiceSnapshot;
use serde::Serialize;

use crate::state::AppState;

/// `GET /health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when any service is degraded or failed.
    pub status: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Template store backend.
    pub storage: &'static str,
    /// PDF converter, if enabled.
    pub pdf: Option<String>,
    /// Per-service state.
    pub services: Vec<ServiceSnapshot>,
}

/// `GET /health` (no auth required).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let services: Vec<ServiceSnapshot> = state.services().iter().map(|s| s.snapshot()).collect();
    let healthy = services
        .iter()
        .all(|s| matches!(s.state, ServiceState::Ready | ServiceState::Starting | ServiceState::Stopped));

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        storage: state.store.backend(),
        pdf: state.converter.as_ref().map(|c| c.name().to_string()),
        services,
    })
}
