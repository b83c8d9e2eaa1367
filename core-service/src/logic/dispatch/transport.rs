//! Collector transport
//!
//! One request per `send`, fixed timeout, no internal retry. Retrying is
//! the Escalator's job.

use std::time::Duration;

use async_trait::async_trait;

use super::payload::{AlertPayload, DispatchOutcome};
use crate::logic::errors::DispatchError;

#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(&self, payload: &AlertPayload) -> DispatchOutcome;
}

/// `POST {collector}/alert` with a JSON body
pub struct HttpTransport {
    url: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(collector_url: &str, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build collector HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });

        Self {
            url: format!("{}/alert", collector_url.trim_end_matches('/')),
            http_client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, payload: &AlertPayload) -> Result<u16, DispatchError> {
        let body = serde_json::to_vec(payload).map_err(|e| DispatchError::Serialize(e.to_string()))?;

        let response = self
            .http_client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            log::error!("Failed to send alert: HTTP {} - {}", status, text.trim());
            return Err(DispatchError::Status(status));
        }

        Ok(status)
    }
}

#[async_trait]
impl AlertTransport for HttpTransport {
    async fn send(&self, payload: &AlertPayload) -> DispatchOutcome {
        log::info!("Sending alert to collector: {}", self.url);

        match self.post(payload).await {
            Ok(status) => {
                log::info!("Alert sent successfully");
                DispatchOutcome::from_status(status)
            }
            Err(DispatchError::Status(status)) => DispatchOutcome::from_status(status),
            Err(e) => {
                log::error!("[DispatchError] {}", e);
                DispatchOutcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::ReadingValues;
    use crate::logic::test_support::serve_capture;

    fn payload() -> AlertPayload {
        AlertPayload {
            timestamp: 1_700_000_000.0,
            abnormal_count: 10,
            last_reading: ReadingValues {
                temperature: 45.0,
                humidity: 10.0,
                pressure: 1000.0,
                gas_oxidising: 9.0,
                gas_reducing: 90.0,
                gas_nh3: 30.0,
            },
            fire_detected: true,
            fire_confidence: 0.88,
            image: Some(vec![0xFF, 0xD8]),
        }
    }

    #[test]
    fn test_url_join() {
        let t = HttpTransport::new("http://10.0.0.5:8000/", Duration::from_secs(10));
        assert_eq!(t.url(), "http://10.0.0.5:8000/alert");
    }

    #[tokio::test]
    async fn test_200_delivers() {
        let (url, request) = serve_capture(200, r#"{"status":"alert_received"}"#).await;
        let outcome = HttpTransport::new(&url, Duration::from_secs(5)).send(&payload()).await;

        assert!(outcome.delivered);
        assert_eq!(outcome.status, Some(200));

        let request = request.await.unwrap();
        assert!(request.head.starts_with("POST /alert "));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["abnormal_count"], 10);
        assert_eq!(body["image"], "/9g=");
    }

    #[tokio::test]
    async fn test_201_is_not_delivered() {
        let (url, _) = serve_capture(201, "{}").await;
        let outcome = HttpTransport::new(&url, Duration::from_secs(5)).send(&payload()).await;
        assert!(!outcome.delivered);
        assert_eq!(outcome.status, Some(201));
    }

    #[tokio::test]
    async fn test_500_is_not_delivered() {
        let (url, _) = serve_capture(500, r#"{"status":"error","message":"disk full"}"#).await;
        let outcome = HttpTransport::new(&url, Duration::from_secs(5)).send(&payload()).await;
        assert!(!outcome.delivered);
        assert_eq!(outcome.status, Some(500));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let outcome = HttpTransport::new("http://127.0.0.1:1", Duration::from_secs(2))
            .send(&payload())
            .await;
        assert!(!outcome.delivered);
        assert_eq!(outcome.status, None);
        assert!(outcome.error.is_some());
    }
}
