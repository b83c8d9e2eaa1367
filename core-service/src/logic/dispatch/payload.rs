//! Alert payload and dispatch outcome

use serde::{Deserialize, Serialize};

use crate::logic::capture::CaptureResult;
use crate::logic::features::{unix_now, Reading, ReadingValues};
use crate::logic::validation::CascadeReport;

/// What the collector receives on `POST /alert`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Unix seconds (fractional) when the alert was built
    pub timestamp: f64,
    pub abnormal_count: u32,
    pub last_reading: ReadingValues,
    pub fire_detected: bool,
    pub fire_confidence: f64,
    /// JPEG bytes, base64 on the wire
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_image")]
    pub image: Option<Vec<u8>>,
}

impl AlertPayload {
    pub fn build(
        abnormal_count: u32,
        reading: &Reading,
        report: &CascadeReport,
        capture: &CaptureResult,
    ) -> Self {
        Self {
            timestamp: unix_now(),
            abnormal_count,
            last_reading: reading.values(),
            fire_detected: report.fire_detected(),
            fire_confidence: report.fire_confidence,
            image: capture.image_bytes.clone().filter(|b| !b.is_empty()),
        }
    }
}

mod base64_image {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(image: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match image {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(s) if !s.is_empty() => STANDARD
                .decode(s.as_bytes())
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid base64 image: {}", e))),
            _ => Ok(None),
        }
    }
}

/// Result of one `send`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    /// Delivered iff the collector answered exactly 200
    pub fn from_status(status: u16) -> Self {
        let delivered = status == 200;
        Self {
            delivered,
            status: Some(status),
            error: if delivered {
                None
            } else {
                Some(format!("collector returned HTTP {}", status))
            },
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            delivered: false,
            status: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::validation::{CascadeReport, Verdict};

    fn reading() -> Reading {
        Reading {
            timestamp: 1.0,
            temperature: 52.0,
            humidity: 9.0,
            pressure: 1003.0,
            gas_oxidising: 12.5,
            gas_reducing: 80.0,
            gas_nh3: 40.0,
        }
    }

    fn report(raw: Verdict, confidence: f64) -> CascadeReport {
        CascadeReport {
            stages: Vec::new(),
            raw,
            decision: Verdict::Fire,
            fail_open_applied: raw == Verdict::Unavailable,
            fire_confidence: confidence,
        }
    }

    #[test]
    fn test_wire_field_names() {
        let payload = AlertPayload::build(
            10,
            &reading(),
            &report(Verdict::Fire, 0.91),
            &CaptureResult::image(vec![1, 2, 3], "a.jpg"),
        );
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["abnormal_count"], 10);
        assert_eq!(json["fire_detected"], true);
        assert_eq!(json["fire_confidence"], 0.91);
        assert_eq!(json["last_reading"]["gas_oxidising"], 12.5);
        assert!(json["last_reading"].get("timestamp").is_none());
        assert_eq!(json["image"], "AQID");
        assert!(json["timestamp"].as_f64().unwrap() > 1_600_000_000.0);
    }

    #[test]
    fn test_image_omitted_when_absent() {
        let payload = AlertPayload::build(3, &reading(), &report(Verdict::Unavailable, 0.0), &CaptureResult::absent());
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("image").is_none());
        assert_eq!(json["fire_detected"], false);

        let back: AlertPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.image, None);
    }

    #[test]
    fn test_bad_base64_rejected() {
        let body = r#"{"timestamp": 1.0, "abnormal_count": 1, "fire_detected": false, "fire_confidence": 0.0,
            "last_reading": {"temperature": 1, "humidity": 1, "pressure": 1, "gas_oxidising": 1, "gas_reducing": 1, "gas_nh3": 1},
            "image": "***"}"#;
        assert!(serde_json::from_str::<AlertPayload>(body).is_err());
    }

    #[test]
    fn test_outcome_only_200_delivers() {
        assert!(DispatchOutcome::from_status(200).delivered);
        for status in [201, 202, 204, 301, 400, 404, 500, 503] {
            let outcome = DispatchOutcome::from_status(status);
            assert!(!outcome.delivered, "HTTP {} must not count as delivered", status);
            assert_eq!(outcome.status, Some(status));
        }
        assert!(!DispatchOutcome::failed("refused").delivered);
    }
}
