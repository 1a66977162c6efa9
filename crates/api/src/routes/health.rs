//! Liveness endpoint.
//!
//! Mounted outside the auth middleware so load balancers and uptime probes
//! can reach it without a token. Deliberately touches nothing but the
//! process itself: it keeps answering even while the database is down.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::AppState;

/// Body returned by the liveness probe.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the process can answer at all.
    pub status: &'static str,
    /// Crate version baked in at compile time.
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates the health routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
