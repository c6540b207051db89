//! Service status endpoints.

use axum::extract::State;
use axum::Json;
use chess_analysis::{HealthReport, ServiceDescriptor};

use crate::AppState;

/// GET /
///
/// Service name, version and the engine location found at startup.
pub async fn root(State(state): State<AppState>) -> Json<ServiceDescriptor> {
    Json(state.service.descriptor().await)
}

/// GET /health
///
/// Runs a depth-1 search on the starting position. Always answers 200; a
/// broken or missing engine is reported in the body.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.check_health().await)
}
