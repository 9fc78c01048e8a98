//! RealtimeHub - WebSocket Distribution
//!
//! ## Responsibilities
//!
//! - WebSocket connection management
//! - Per-tick outcome broadcasting (detection result + verdict)
//! - Alert, failure and session status notifications
//!
//! Suppressed and no-subject verdicts are only ever pushed here; they are
//! never recorded in the alert log.

use crate::decision_engine::Verdict;
use crate::models::{Alert, DetectionResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Hub message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HubMessage {
    /// Result of one analysed tick
    TickOutcome(TickOutcomeMessage),
    /// An alert was appended to the alert log
    AlertRaised(Alert),
    /// Tick produced no result because analysis failed
    AnalysisFailed(TickFailureMessage),
    /// Tick produced no result because the frame could not be captured
    CaptureFailed(TickFailureMessage),
    /// Session lifecycle change
    SessionStatus(SessionStatusMessage),
}

impl HubMessage {
    fn kind(&self) -> &'static str {
        match self {
            HubMessage::TickOutcome(_) => "tick_outcome",
            HubMessage::AlertRaised(_) => "alert_raised",
            HubMessage::AnalysisFailed(_) => "analysis_failed",
            HubMessage::CaptureFailed(_) => "capture_failed",
            HubMessage::SessionStatus(_) => "session_status",
        }
    }
}

/// Tick outcome message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickOutcomeMessage {
    pub session_id: Uuid,
    pub detection: DetectionResult,
    pub verdict: Verdict,
}

/// Tick failure message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickFailureMessage {
    pub session_id: Uuid,
    pub error_code: String,
    pub message: String,
    pub timestamp: String,
}

/// Session status message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusMessage {
    pub active: bool,
    pub session_id: Option<Uuid>,
    pub timestamp: String,
}

/// Client connection
struct ClientConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new client
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { id, tx });
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, "Client connected");

        (id, rx)
    }

    /// Unregister a client
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Client disconnected");
        }
    }

    /// Broadcast message to all clients
    pub async fn broadcast(&self, message: HubMessage) {
        tracing::debug!(message_type = %message.kind(), "Broadcasting message to clients");

        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                return;
            }
        };

        let connections = self.connections.read().await;
        for conn in connections.values() {
            if let Err(e) = conn.tx.send(json.clone()) {
                tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
            }
        }
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
