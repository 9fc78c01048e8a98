//! Shared data models
//!
//! Detection results flowing out of the vision adapter, persisted alert
//! records, and the API envelope used by the web layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire label for a safe zone
pub const SAFE_ZONE_LABEL: &str = "Safe Zone";
/// Wire label for a high-risk zone
pub const HIGH_RISK_ZONE_LABEL: &str = "High Risk Zone";

/// Coarse hazard classification of the camera's field of view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    Safe,
    HighRisk,
    /// Label returned by the model was not one of the two known labels
    Unknown,
}

impl ZoneType {
    /// Map a model-provided label onto the closed enumeration.
    ///
    /// Anything other than the two known labels degrades to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case(HIGH_RISK_ZONE_LABEL) {
            ZoneType::HighRisk
        } else if label.eq_ignore_ascii_case(SAFE_ZONE_LABEL) {
            ZoneType::Safe
        } else {
            ZoneType::Unknown
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ZoneType::Safe => SAFE_ZONE_LABEL,
            ZoneType::HighRisk => HIGH_RISK_ZONE_LABEL,
            ZoneType::Unknown => "Unknown Zone",
        }
    }
}

/// Structured result of analysing one frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub worker_present: bool,
    pub helmet_present: bool,
    pub zone_type: ZoneType,
    pub reasoning: String,
    /// Capture time, stamped locally (never by the remote service)
    pub timestamp: DateTime<Utc>,
}

/// Alert severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Danger,
}

/// Persisted compliance alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// Assigned by the alert log on append
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    pub context: String,
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> ApiResponse<T> {
        ApiResponse {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// API error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub vision_connected: bool,
    pub session_active: bool,
}
