//! Error handling for ZoneGuard

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::{ApiError, ApiResponse};
use crate::vision_client::AnalysisError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame source could not be acquired or read
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Vision analysis failed for a single tick
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Operation not valid in the current session state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code, shared by HTTP responses and hub messages
    pub fn code(&self) -> &'static str {
        match self {
            Error::CameraUnavailable(_) => "CAMERA_UNAVAILABLE",
            Error::Analysis(e) => e.code(),
            Error::Conflict(_) => "CONFLICT",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::CameraUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Analysis(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Config(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let message = self.to_string();

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(ApiResponse::<()>::error(ApiError {
            code: error_code.to_string(),
            message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::CameraUnavailable("denied".into()).code(),
            "CAMERA_UNAVAILABLE"
        );
        assert_eq!(
            Error::from(AnalysisError::Timeout).code(),
            "ANALYSIS_TIMEOUT"
        );
        assert_eq!(Error::Conflict("active".into()).code(), "CONFLICT");
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let resp = Error::Conflict("session already active".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_error_body_uses_api_envelope() {
        let resp = Error::Conflict("session already active".into()).into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["ok"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["message"], "Conflict: session already active");
    }

    #[test]
    fn test_camera_unavailable_maps_to_503() {
        let resp = Error::CameraUnavailable("no device".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
