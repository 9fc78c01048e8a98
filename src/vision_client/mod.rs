//! VisionClient - Vision Model Communication Adapter
//!
//! ## Responsibilities
//!
//! - Send one JPEG frame plus the fixed instruction prompt to the vision model
//! - Parse the model's JSON answer into a DetectionResult
//! - Classify failures as network, timeout or malformed response
//!
//! The model is opaque: only its request/response shape is relied upon.

use crate::error::Result;
use crate::models::{DetectionResult, ZoneType, HIGH_RISK_ZONE_LABEL, SAFE_ZONE_LABEL};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Per-tick analysis failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("response timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl AnalysisError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::NetworkFailure(_) => "ANALYSIS_NETWORK_FAILURE",
            AnalysisError::Timeout => "ANALYSIS_TIMEOUT",
            AnalysisError::MalformedResponse(_) => "ANALYSIS_MALFORMED_RESPONSE",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnalysisError::Timeout
        } else if e.is_decode() {
            AnalysisError::MalformedResponse(e.to_string())
        } else {
            AnalysisError::NetworkFailure(e.to_string())
        }
    }
}

/// Anything that can turn a frame into a detection result
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    /// Analyse one JPEG frame. `captured_at` becomes the result timestamp.
    async fn analyze(
        &self,
        frame: &[u8],
        captured_at: DateTime<Utc>,
    ) -> std::result::Result<DetectionResult, AnalysisError>;
}

/// Instruction sent alongside every frame
pub fn analysis_prompt() -> String {
    format!(
        "Analyze this image from a worksite safety camera. \
         1. Is there a worker (person) visible? \
         2. If a worker is visible, are they wearing a safety helmet (hard hat)? \
         3. Classify the area shown as either \"{safe}\" or \"{high_risk}\". \
         Areas with heavy machinery, scaffolding, open excavations, overhead loads \
         or active construction are \"{high_risk}\"; offices, break rooms and \
         walkways away from hazards are \"{safe}\". \
         Respond with JSON containing workerPresent (boolean), helmetPresent \
         (boolean), zoneType (string, exactly \"{safe}\" or \"{high_risk}\") and \
         reasoning (short explanation).",
        safe = SAFE_ZONE_LABEL,
        high_risk = HIGH_RISK_ZONE_LABEL,
    )
}

/// JSON shape the model is asked to produce
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectionPayload {
    worker_present: bool,
    helmet_present: bool,
    zone_type: String,
    reasoning: String,
}

/// generateContent response envelope
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

/// Request body for generateContent
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    contents: Vec<serde_json::Value>,
    #[serde(rename = "generationConfig")]
    generation_config: serde_json::Value,
}

impl GenerateContentRequest {
    /// Build the request for one frame
    pub fn for_frame(frame: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(frame);
        Self {
            contents: vec![json!({
                "parts": [
                    { "inline_data": { "mime_type": "image/jpeg", "data": encoded } },
                    { "text": analysis_prompt() }
                ]
            })],
            generation_config: json!({
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "workerPresent": { "type": "BOOLEAN" },
                        "helmetPresent": { "type": "BOOLEAN" },
                        "zoneType": {
                            "type": "STRING",
                            "enum": [SAFE_ZONE_LABEL, HIGH_RISK_ZONE_LABEL]
                        },
                        "reasoning": { "type": "STRING" }
                    },
                    "required": ["workerPresent", "helmetPresent", "zoneType", "reasoning"]
                }
            }),
        }
    }
}

/// Parse the model's JSON text into a detection result.
///
/// Missing fields and wrong JSON types are malformed; an unrecognized
/// zone label is not, it becomes `ZoneType::Unknown`.
pub fn parse_detection(
    text: &str,
    captured_at: DateTime<Utc>,
) -> std::result::Result<DetectionResult, AnalysisError> {
    let payload: DetectionPayload = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let zone_type = ZoneType::from_label(&payload.zone_type);
    if zone_type == ZoneType::Unknown {
        tracing::debug!(zone_label = %payload.zone_type, "Unrecognized zone label, using Unknown");
    }

    Ok(DetectionResult {
        worker_present: payload.worker_present,
        helmet_present: payload.helmet_present,
        zone_type,
        reasoning: payload.reasoning,
        timestamp: captured_at,
    })
}

/// Extract the model text from a generateContent envelope and parse it
pub fn parse_generate_content(
    body: &str,
    captured_at: DateTime<Utc>,
) -> std::result::Result<DetectionResult, AnalysisError> {
    let envelope: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedResponse(format!("envelope: {}", e)))?;

    let text = envelope
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .ok_or_else(|| AnalysisError::MalformedResponse("no text in response".to_string()))?;

    parse_detection(&text, captured_at)
}

/// Models occasionally wrap JSON in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Vision model client (generateContent API)
pub struct VisionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl VisionClient {
    /// Create new vision client with custom timeout
    pub fn with_timeout(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            timeout,
        })
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model)
    }

    /// Check that the model endpoint is reachable and the key is accepted
    pub async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl FrameAnalyzer for VisionClient {
    async fn analyze(
        &self,
        frame: &[u8],
        captured_at: DateTime<Utc>,
    ) -> std::result::Result<DetectionResult, AnalysisError> {
        let url = format!("{}:generateContent", self.model_url());
        let request = GenerateContentRequest::for_frame(frame);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::NetworkFailure(format!(
                "vision service returned {} - {}",
                status, body
            )));
        }

        let body = resp.text().await?;
        let result = parse_generate_content(&body, captured_at)?;

        tracing::debug!(
            model = %self.model,
            worker_present = result.worker_present,
            helmet_present = result.helmet_present,
            zone = ?result.zone_type,
            "Frame analyzed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_detection() {
        let now = Utc::now();
        let text = r#"{"workerPresent":true,"helmetPresent":false,"zoneType":"High Risk Zone","reasoning":"Worker near crane"}"#;

        let result = parse_detection(text, now).unwrap();
        assert!(result.worker_present);
        assert!(!result.helmet_present);
        assert_eq!(result.zone_type, ZoneType::HighRisk);
        assert_eq!(result.reasoning, "Worker near crane");
        assert_eq!(result.timestamp, now);
    }

    #[test]
    fn test_missing_reasoning_is_malformed() {
        let text = r#"{"workerPresent":true,"helmetPresent":false,"zoneType":"Safe Zone"}"#;
        let err = parse_detection(text, Utc::now()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let text = r#"{"workerPresent":"yes","helmetPresent":false,"zoneType":"Safe Zone","reasoning":""}"#;
        let err = parse_detection(text, Utc::now()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn test_zone_type_wrong_json_type_is_malformed() {
        for zone in ["5", "null"] {
            let text = format!(
                r#"{{"workerPresent":true,"helmetPresent":false,"zoneType":{},"reasoning":"x"}}"#,
                zone
            );
            let err = parse_detection(&text, Utc::now()).unwrap_err();
            assert!(matches!(err, AnalysisError::MalformedResponse(_)), "zoneType {}", zone);
        }
    }

    #[test]
    fn test_unrecognized_zone_falls_back_to_unknown() {
        let text = r#"{"workerPresent":true,"helmetPresent":false,"zoneType":"Loading Dock","reasoning":"unclear"}"#;
        let result = parse_detection(text, Utc::now()).unwrap();
        assert_eq!(result.zone_type, ZoneType::Unknown);
    }

    #[test]
    fn test_fenced_json_is_accepted() {
        let text = "```json\n{\"workerPresent\":false,\"helmetPresent\":false,\"zoneType\":\"Safe Zone\",\"reasoning\":\"empty room\"}\n```";
        let result = parse_detection(text, Utc::now()).unwrap();
        assert!(!result.worker_present);
        assert_eq!(result.zone_type, ZoneType::Safe);
    }

    #[test]
    fn test_parse_generate_content_envelope() {
        let inner = r#"{"workerPresent":true,"helmetPresent":true,"zoneType":"Safe Zone","reasoning":"ok"}"#;
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": inner }] } }]
        })
        .to_string();

        let result = parse_generate_content(&body, Utc::now()).unwrap();
        assert!(result.helmet_present);
    }

    #[test]
    fn test_empty_candidates_is_malformed() {
        let err = parse_generate_content(r#"{"candidates":[]}"#, Utc::now()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));

        let err = parse_generate_content("not json", Utc::now()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn test_request_carries_frame_and_labels() {
        let request = GenerateContentRequest::for_frame(&[0xFF, 0xD8, 0xFF]);
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[0]["inline_data"]["data"], "/9j/");

        let prompt = parts[1]["text"].as_str().unwrap();
        assert!(prompt.contains("\"Safe Zone\""));
        assert!(prompt.contains("\"High Risk Zone\""));
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    async fn serve_stub(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String, timeout: Duration) -> VisionClient {
        VisionClient::with_timeout(base_url, "test-model".into(), "key".into(), timeout).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_good_envelope() {
        let router = axum::Router::new().fallback(|| async {
            axum::Json(json!({
                "candidates": [{ "content": { "parts": [{
                    "text": r#"{"workerPresent":true,"helmetPresent":false,"zoneType":"High Risk Zone","reasoning":"crane"}"#
                }] } }]
            }))
        });
        let vision = client(serve_stub(router).await, Duration::from_secs(5));

        let now = Utc::now();
        let result = vision.analyze(&[0xFF, 0xD8], now).await.unwrap();
        assert!(result.worker_present);
        assert!(!result.helmet_present);
        assert_eq!(result.zone_type, ZoneType::HighRisk);
        assert_eq!(result.timestamp, now);
    }

    #[tokio::test]
    async fn test_analyze_server_error_is_network_failure() {
        let router = axum::Router::new().fallback(|| async {
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "quota exceeded")
        });
        let vision = client(serve_stub(router).await, Duration::from_secs(5));

        let err = vision.analyze(&[0xFF, 0xD8], Utc::now()).await.unwrap_err();
        match err {
            AnalysisError::NetworkFailure(msg) => assert!(msg.contains("500")),
            other => panic!("expected NetworkFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_analyze_slow_server_is_timeout() {
        let router = axum::Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "late"
        });
        let vision = client(serve_stub(router).await, Duration::from_millis(100));

        let err = vision.analyze(&[0xFF, 0xD8], Utc::now()).await.unwrap_err();
        assert_eq!(err, AnalysisError::Timeout);
    }

    #[tokio::test]
    async fn test_analyze_non_json_body_is_malformed() {
        let router = axum::Router::new().fallback(|| async { "<html>maintenance</html>" });
        let vision = client(serve_stub(router).await, Duration::from_secs(5));

        let err = vision.analyze(&[0xFF, 0xD8], Utc::now()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_analyze_unreachable_is_network_failure() {
        let vision = client("http://127.0.0.1:9".into(), Duration::from_secs(2));
        let err = vision.analyze(&[0xFF, 0xD8], Utc::now()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NetworkFailure(_)));
    }
}
