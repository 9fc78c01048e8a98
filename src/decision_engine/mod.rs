//! DecisionEngine - Zone-conditioned alerting rule
//!
//! ## Responsibilities
//!
//! - Map a DetectionResult to a Verdict (pure, no hidden state)
//! - Compose the Alert record for an escalated verdict
//!
//! Missing gear is only escalated inside a high-risk zone. Unknown zones
//! are treated like safe ones for alerting purposes.

use crate::models::{Alert, DetectionResult, Severity, ZoneType};
use serde::{Deserialize, Serialize};

/// Message carried by every helmet violation alert
pub const MISSING_HELMET_MESSAGE: &str = "Safety Gear Violation: Missing Helmet";

/// Decision outcome for a single tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Alert(String),
    Suppressed(String),
    NoSubject,
}

impl Verdict {
    pub fn is_alert(&self) -> bool {
        matches!(self, Verdict::Alert(_))
    }
}

/// Decide whether a detection result warrants an alert
pub fn decide(result: &DetectionResult) -> Verdict {
    if !result.worker_present {
        Verdict::NoSubject
    } else if result.helmet_present {
        Verdict::Suppressed("compliant".to_string())
    } else if result.zone_type == ZoneType::HighRisk {
        Verdict::Alert("missing helmet in high-risk zone".to_string())
    } else {
        Verdict::Suppressed("missing gear in safe/unknown zone".to_string())
    }
}

/// Build the alert record for a result that produced `Verdict::Alert`.
///
/// The id is left at 0; the alert log assigns it on append.
pub fn build_alert(result: &DetectionResult) -> Alert {
    Alert {
        id: 0,
        timestamp: result.timestamp,
        message: MISSING_HELMET_MESSAGE.to_string(),
        severity: Severity::Danger,
        context: format!("Zone: {}. {}", result.zone_type.label(), result.reasoning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(worker: bool, helmet: bool, zone: ZoneType) -> DetectionResult {
        DetectionResult {
            worker_present: worker,
            helmet_present: helmet,
            zone_type: zone,
            reasoning: "test frame".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_alert_iff_worker_without_helmet_in_high_risk() {
        let zones = [ZoneType::Safe, ZoneType::HighRisk, ZoneType::Unknown];
        for worker in [false, true] {
            for helmet in [false, true] {
                for zone in zones {
                    let verdict = decide(&result(worker, helmet, zone));
                    let expected = worker && !helmet && zone == ZoneType::HighRisk;
                    assert_eq!(
                        verdict.is_alert(),
                        expected,
                        "worker={} helmet={} zone={:?} -> {:?}",
                        worker,
                        helmet,
                        zone,
                        verdict
                    );
                }
            }
        }
    }

    #[test]
    fn test_decide_is_deterministic() {
        let input = result(true, false, ZoneType::HighRisk);
        assert_eq!(decide(&input), decide(&input));
        assert_eq!(decide(&input), decide(&input.clone()));
    }

    #[test]
    fn test_no_worker_is_no_subject() {
        for zone in [ZoneType::Safe, ZoneType::HighRisk, ZoneType::Unknown] {
            assert_eq!(decide(&result(false, false, zone)), Verdict::NoSubject);
            assert_eq!(decide(&result(false, true, zone)), Verdict::NoSubject);
        }
    }

    #[test]
    fn test_helmet_present_is_compliant() {
        assert_eq!(
            decide(&result(true, true, ZoneType::HighRisk)),
            Verdict::Suppressed("compliant".to_string())
        );
    }

    #[test]
    fn test_missing_helmet_outside_high_risk_is_suppressed() {
        let expected = Verdict::Suppressed("missing gear in safe/unknown zone".to_string());
        assert_eq!(decide(&result(true, false, ZoneType::Safe)), expected);
        assert_eq!(decide(&result(true, false, ZoneType::Unknown)), expected);
    }

    #[test]
    fn test_build_alert() {
        let mut input = result(true, false, ZoneType::HighRisk);
        input.reasoning = "Worker near scaffolding without a hard hat".to_string();

        let alert = build_alert(&input);
        assert_eq!(alert.message, MISSING_HELMET_MESSAGE);
        assert_eq!(alert.severity, Severity::Danger);
        assert_eq!(alert.timestamp, input.timestamp);
        assert_eq!(
            alert.context,
            "Zone: High Risk Zone. Worker near scaffolding without a hard hat"
        );
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_value(Verdict::Alert("x".into())).unwrap();
        assert_eq!(json["kind"], "alert");
        assert_eq!(json["reason"], "x");

        let json = serde_json::to_value(Verdict::NoSubject).unwrap();
        assert_eq!(json["kind"], "no_subject");
    }
}
