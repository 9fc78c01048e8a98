//! SessionController types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monitoring lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active {
        /// Epoch of the running session; results tagged with another id are stale
        session_id: Uuid,
        started_at: DateTime<Utc>,
    },
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }

    /// Whether `session_id` is the currently running session
    pub fn is_session(&self, session_id: Uuid) -> bool {
        matches!(self, SessionState::Active { session_id: current, .. } if *current == session_id)
    }

    pub fn to_status(&self) -> SessionStatus {
        match *self {
            SessionState::Idle => SessionStatus {
                active: false,
                session_id: None,
                started_at: None,
            },
            SessionState::Active {
                session_id,
                started_at,
            } => SessionStatus {
                active: true,
                session_id: Some(session_id),
                started_at: Some(started_at),
            },
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Session status (for API)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStatus {
    pub active: bool,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Tick outcome counters for the life of the process
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks_analyzed: u64,
    pub capture_failures: u64,
    pub analysis_failures: u64,
    pub alerts: u64,
    pub suppressed: u64,
    pub no_subject: u64,
    /// Results that resolved after their session was stopped
    pub late_results_discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_session_matches_only_current_epoch() {
        let id = Uuid::new_v4();
        let state = SessionState::Active {
            session_id: id,
            started_at: Utc::now(),
        };
        assert!(state.is_session(id));
        assert!(!state.is_session(Uuid::new_v4()));
        assert!(!SessionState::Idle.is_session(id));
    }

    #[test]
    fn test_idle_status() {
        let status = SessionState::default().to_status();
        assert!(!status.active);
        assert!(status.session_id.is_none());
    }
}
