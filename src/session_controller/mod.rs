//! SessionController - Monitoring Lifecycle
//!
//! ## Responsibilities
//!
//! - Idle/Active state machine (start acquires the camera, stop releases it)
//! - Wire Scheduler -> FrameSource -> FrameAnalyzer -> DecisionEngine -> AlertLog
//! - Discard results of ticks that resolve after their session was stopped
//! - Push every tick outcome to the RealtimeHub
//!
//! Results are applied under the session-state read lock and only when the
//! session id they were started under is still the active one. `stop()`
//! takes the write lock, so a result either lands before stop or not at all.

mod types;

pub use types::*;

use crate::alert_log::AlertLog;
use crate::decision_engine::{build_alert, decide, Verdict};
use crate::error::{Error, Result};
use crate::frame_source::FrameSource;
use crate::models::{Alert, DetectionResult};
use crate::realtime_hub::{
    HubMessage, RealtimeHub, SessionStatusMessage, TickFailureMessage, TickOutcomeMessage,
};
use crate::scheduler::{Scheduler, SchedulerStats};
use crate::vision_client::{AnalysisError, FrameAnalyzer};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Everything a tick needs, cloned into each scheduled job
#[derive(Clone)]
struct TickContext {
    frame_source: Arc<dyn FrameSource>,
    analyzer: Arc<dyn FrameAnalyzer>,
    state: Arc<RwLock<SessionState>>,
    alert_log: Arc<RwLock<AlertLog>>,
    stats: Arc<RwLock<SessionStats>>,
    realtime: Arc<RealtimeHub>,
}

impl TickContext {
    /// One capture -> analyze -> decide cycle
    async fn run_tick(&self, session_id: Uuid) {
        if !self.state.read().await.is_session(session_id) {
            return;
        }

        let frame = match self.frame_source.get_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                self.apply_capture_failure(session_id, e).await;
                return;
            }
        };

        let captured_at = Utc::now();
        let outcome = self.analyzer.analyze(&frame, captured_at).await;
        self.apply_analysis(session_id, outcome).await;
    }

    async fn apply_capture_failure(&self, session_id: Uuid, error: Error) {
        let state = self.state.read().await;
        if !state.is_session(session_id) {
            self.stats.write().await.late_results_discarded += 1;
            return;
        }

        tracing::warn!(session_id = %session_id, error = %error, "Frame capture failed, tick skipped");
        self.stats.write().await.capture_failures += 1;

        self.realtime
            .broadcast(HubMessage::CaptureFailed(TickFailureMessage {
                session_id,
                error_code: error.code().to_string(),
                message: error.to_string(),
                timestamp: Utc::now().to_rfc3339(),
            }))
            .await;
    }

    async fn apply_analysis(
        &self,
        session_id: Uuid,
        outcome: std::result::Result<DetectionResult, AnalysisError>,
    ) {
        // Held until the end so stop() cannot interleave with the write below
        let state = self.state.read().await;
        if !state.is_session(session_id) {
            tracing::debug!(session_id = %session_id, "Discarding result of stopped session");
            self.stats.write().await.late_results_discarded += 1;
            return;
        }

        let detection = match outcome {
            Ok(detection) => detection,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error_code = %e.code(),
                    error = %e,
                    "Frame analysis failed, tick produced no verdict"
                );
                self.stats.write().await.analysis_failures += 1;

                self.realtime
                    .broadcast(HubMessage::AnalysisFailed(TickFailureMessage {
                        session_id,
                        error_code: e.code().to_string(),
                        message: e.to_string(),
                        timestamp: Utc::now().to_rfc3339(),
                    }))
                    .await;
                return;
            }
        };

        let verdict = decide(&detection);
        let mut raised: Option<Alert> = None;

        {
            let mut stats = self.stats.write().await;
            stats.ticks_analyzed += 1;

            match &verdict {
                Verdict::Alert(reason) => {
                    let mut alert = build_alert(&detection);
                    alert.id = self.alert_log.write().await.append(alert.clone());
                    stats.alerts += 1;

                    tracing::warn!(
                        session_id = %session_id,
                        alert_id = alert.id,
                        reason = %reason,
                        context = %alert.context,
                        "Compliance alert raised"
                    );
                    raised = Some(alert);
                }
                Verdict::Suppressed(reason) => {
                    stats.suppressed += 1;
                    tracing::info!(
                        session_id = %session_id,
                        zone = ?detection.zone_type,
                        reason = %reason,
                        reasoning = %detection.reasoning,
                        "Verdict suppressed"
                    );
                }
                Verdict::NoSubject => {
                    stats.no_subject += 1;
                    tracing::debug!(session_id = %session_id, "No worker in frame");
                }
            }
        }

        self.realtime
            .broadcast(HubMessage::TickOutcome(TickOutcomeMessage {
                session_id,
                detection,
                verdict,
            }))
            .await;

        if let Some(alert) = raised {
            self.realtime.broadcast(HubMessage::AlertRaised(alert)).await;
        }

        drop(state);
    }
}

/// SessionController instance
pub struct SessionController {
    scheduler: Scheduler,
    ctx: TickContext,
}

impl SessionController {
    /// Create new SessionController
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        analyzer: Arc<dyn FrameAnalyzer>,
        realtime: Arc<RealtimeHub>,
        tick_period: Duration,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(tick_period),
            ctx: TickContext {
                frame_source,
                analyzer,
                state: Arc::new(RwLock::new(SessionState::Idle)),
                alert_log: Arc::new(RwLock::new(AlertLog::new())),
                stats: Arc::new(RwLock::new(SessionStats::default())),
                realtime,
            },
        }
    }

    /// Idle -> Active. Fails with `CameraUnavailable` (staying Idle) if the
    /// frame source cannot be acquired, or `Conflict` if already active.
    pub async fn start(&self) -> Result<SessionStatus> {
        let status = {
            let mut state = self.ctx.state.write().await;
            if let SessionState::Active { session_id, .. } = *state {
                return Err(Error::Conflict(format!(
                    "session {} already active",
                    session_id
                )));
            }

            if let Err(e) = self.ctx.frame_source.acquire().await {
                tracing::error!(
                    source = %self.ctx.frame_source.describe(),
                    error = %e,
                    "Frame source acquisition failed, session stays idle"
                );
                return Err(match e {
                    Error::CameraUnavailable(_) => e,
                    other => Error::CameraUnavailable(other.to_string()),
                });
            }

            let session_id = Uuid::new_v4();
            let ctx = self.ctx.clone();
            let started = self
                .scheduler
                .start(move || {
                    let ctx = ctx.clone();
                    async move { ctx.run_tick(session_id).await }
                })
                .await;

            if !started {
                self.ctx.frame_source.release().await;
                return Err(Error::Internal("scheduler already running".to_string()));
            }

            *state = SessionState::Active {
                session_id,
                started_at: Utc::now(),
            };

            tracing::info!(
                session_id = %session_id,
                source = %self.ctx.frame_source.describe(),
                period_secs = self.scheduler.period().as_secs(),
                "Monitoring session started"
            );
            state.to_status()
        };

        self.broadcast_status(&status).await;
        Ok(status)
    }

    /// Active -> Idle. No-op while Idle.
    pub async fn stop(&self) -> Result<SessionStatus> {
        let status = {
            let mut state = self.ctx.state.write().await;
            let SessionState::Active { session_id, .. } = *state else {
                tracing::debug!("Stop requested while idle, ignoring");
                return Ok(state.to_status());
            };

            self.scheduler.stop().await;
            // Under the write lock: a racing start() must acquire after this
            self.ctx.frame_source.release().await;
            *state = SessionState::Idle;

            tracing::info!(
                session_id = %session_id,
                in_flight = self.scheduler.is_busy(),
                "Monitoring session stopped"
            );
            state.to_status()
        };

        self.broadcast_status(&status).await;
        Ok(status)
    }

    async fn broadcast_status(&self, status: &SessionStatus) {
        self.ctx
            .realtime
            .broadcast(HubMessage::SessionStatus(SessionStatusMessage {
                active: status.active,
                session_id: status.session_id,
                timestamp: Utc::now().to_rfc3339(),
            }))
            .await;
    }

    /// Current session status
    pub async fn status(&self) -> SessionStatus {
        self.ctx.state.read().await.to_status()
    }

    pub async fn is_active(&self) -> bool {
        self.ctx.state.read().await.is_active()
    }

    /// Recent alerts, newest first
    pub async fn recent_alerts(&self) -> Vec<Alert> {
        self.ctx.alert_log.read().await.recent()
    }

    /// Tick outcome counters
    pub async fn stats(&self) -> SessionStats {
        self.ctx.stats.read().await.clone()
    }

    /// Scheduler counters
    pub async fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats().await
    }
}
