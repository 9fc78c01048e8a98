//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - Session control and read-only views for the presentation layer
//! - WebSocket push channel
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let vision_ok = state.vision.health_check().await.unwrap_or(false);

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        vision_connected: vision_ok,
        session_active: state.session.is_active().await,
    };

    Json(response)
}
