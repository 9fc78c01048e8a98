//! Application state
//!
//! Holds configuration and the shared components handed to HTTP handlers

use crate::error::{Error, Result};
use crate::realtime_hub::RealtimeHub;
use crate::scheduler::DEFAULT_TICK_PERIOD;
use crate::session_controller::SessionController;
use crate::vision_client::VisionClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn env_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Vision API base URL
    pub vision_api_url: String,
    /// Vision API key (required to start)
    pub vision_api_key: Option<String>,
    /// Vision model name
    pub vision_model: String,
    /// Camera snapshot URL
    pub snapshot_url: String,
    /// Read frames from this JPEG file instead of the snapshot URL
    pub snapshot_file: Option<PathBuf>,
    /// Tick period
    pub tick_interval: Duration,
    /// Timeout for one vision call
    pub analysis_timeout: Duration,
    /// Timeout for one snapshot fetch
    pub capture_timeout: Duration,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vision_api_url: std::env::var("VISION_API_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            vision_api_key: std::env::var("VISION_API_KEY").ok().filter(|k| !k.is_empty()),
            vision_model: std::env::var("VISION_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            snapshot_url: std::env::var("SNAPSHOT_URL")
                .unwrap_or_else(|_| "http://localhost:8554/snapshot.jpg".to_string()),
            snapshot_file: std::env::var("SNAPSHOT_FILE").ok().map(PathBuf::from),
            tick_interval: Duration::from_secs(env_secs(
                "TICK_INTERVAL_SECS",
                DEFAULT_TICK_PERIOD.as_secs(),
            )),
            analysis_timeout: Duration::from_secs(env_secs("ANALYSIS_TIMEOUT_SECS", 20)),
            capture_timeout: Duration::from_secs(env_secs("CAPTURE_TIMEOUT_SECS", 5)),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }
}

impl AppConfig {
    /// API key for the vision service; the service cannot run without one
    pub fn require_vision_api_key(&self) -> Result<String> {
        self.vision_api_key
            .clone()
            .ok_or_else(|| Error::Config("VISION_API_KEY is not set".to_string()))
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// SessionController (monitoring lifecycle)
    pub session: Arc<SessionController>,
    /// VisionClient (for health checks)
    pub vision: Arc<VisionClient>,
    /// RealtimeHub (WebSocket)
    pub realtime: Arc<RealtimeHub>,
    /// Process start, for uptime
    pub started_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_secs_rejects_zero_and_garbage() {
        std::env::set_var("ZONEGUARD_TEST_SECS_ZERO", "0");
        std::env::set_var("ZONEGUARD_TEST_SECS_BAD", "five");
        std::env::set_var("ZONEGUARD_TEST_SECS_OK", "12");

        assert_eq!(env_secs("ZONEGUARD_TEST_SECS_ZERO", 5), 5);
        assert_eq!(env_secs("ZONEGUARD_TEST_SECS_BAD", 5), 5);
        assert_eq!(env_secs("ZONEGUARD_TEST_SECS_OK", 5), 12);
        assert_eq!(env_secs("ZONEGUARD_TEST_SECS_MISSING", 7), 7);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let mut config = AppConfig::default();
        config.vision_api_key = None;
        let err = config.require_vision_api_key().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.code(), "CONFIG_ERROR");

        config.vision_api_key = Some("k".to_string());
        assert_eq!(config.require_vision_api_key().unwrap(), "k");
    }
}
