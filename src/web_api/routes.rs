//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;

use crate::error::Result;
use crate::models::ApiResponse;
use crate::scheduler::SchedulerStats;
use crate::session_controller::SessionStats;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Session
        .route("/api/session", get(get_session))
        .route("/api/session/start", post(start_session))
        .route("/api/session/stop", post(stop_session))
        // Alerts
        .route("/api/alerts", get(list_alerts))
        // Stats
        .route("/api/stats", get(get_stats))
        // WebSocket
        .route("/api/ws", get(websocket_handler))
        .with_state(state)
}

// ========================================
// Session Handlers
// ========================================

async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.session.status().await))
}

async fn start_session(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let status = state.session.start().await?;
    Ok(Json(ApiResponse::success(status)))
}

async fn stop_session(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let status = state.session.stop().await?;
    Ok(Json(ApiResponse::success(status)))
}

// ========================================
// Alert / Stats Handlers
// ========================================

async fn list_alerts(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.session.recent_alerts().await))
}

#[derive(Serialize)]
struct StatsResponse {
    session: SessionStats,
    scheduler: SchedulerStats,
    ws_connections: u64,
}

async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(StatsResponse {
        session: state.session.stats().await,
        scheduler: state.session.scheduler_stats().await,
        ws_connections: state.realtime.connection_count(),
    }))
}

// ========================================
// WebSocket
// ========================================

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut rx) = state.realtime.register().await;

    // Forward hub messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Inbound traffic is ignored apart from close/errors
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.realtime.unregister(&conn_id).await;
}
