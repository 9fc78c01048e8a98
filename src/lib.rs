//! ZoneGuard Library
//!
//! Zone-aware helmet compliance monitor
//!
//! ## Architecture
//!
//! 1. FrameSource - Camera acquisition and per-tick frame capture
//! 2. VisionClient - Vision model adapter (frame -> DetectionResult)
//! 3. DecisionEngine - Zone-conditioned alerting rule
//! 4. AlertLog - Bounded alert history (10 entries, newest first)
//! 5. Scheduler - Periodic ticks with a single-slot busy guard
//! 6. SessionController - Idle/Active lifecycle, wires 1-5 together
//! 7. RealtimeHub - WebSocket distribution of tick outcomes
//! 8. WebAPI - REST endpoints for session control and read views
//!
//! Missing gear only escalates to an alert in a high-risk zone; safe and
//! unrecognized zones degrade to a suppressed verdict.

pub mod alert_log;
pub mod decision_engine;
pub mod error;
pub mod frame_source;
pub mod models;
pub mod realtime_hub;
pub mod scheduler;
pub mod session_controller;
pub mod state;
pub mod vision_client;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
