//! Alert intake

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::{TimeZone, Utc};
use serde::Serialize;

use firesentinel_core::logic::dispatch::AlertPayload;
use firesentinel_core::logic::validation::CascadeReport;

use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub status: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<CascadeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl AlertResponse {
    fn received() -> Self {
        Self {
            status: "alert_received",
            timestamp: Utc::now().to_rfc3339(),
            fire_detected: None,
            alert_sent: None,
            validation: None,
            image_ref: None,
        }
    }
}

/// Receive one field alert: store the image, re-validate, call on fire
pub async fn receive(
    State(state): State<AppState>,
    payload: Result<Json<AlertPayload>, JsonRejection>,
) -> AppResult<Json<AlertResponse>> {
    let Json(payload) = payload?;

    let sent_at = Utc
        .timestamp_opt(payload.timestamp.trunc() as i64, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| payload.timestamp.to_string());
    tracing::warn!(
        abnormal_count = payload.abnormal_count,
        fire_detected = payload.fire_detected,
        fire_confidence = payload.fire_confidence,
        "ALERT RECEIVED (sent {})",
        sent_at
    );
    tracing::info!("Last sensor readings: {:?}", payload.last_reading);

    let mut response = AlertResponse::received();

    let image = match payload.image.as_deref() {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => {
            tracing::info!("Alert carried no image; nothing to validate");
            return Ok(Json(response));
        }
    };

    let stored = state.store.save(&payload, image).await?;
    tracing::info!("Image saved to {}", stored.image_path.display());

    let report = state.cascade.evaluate(Some(image)).await;
    tracing::info!("Validation: {}", report.summary());

    if report.should_escalate() {
        let sent = state.dispatcher.notify().await;
        if sent {
            tracing::warn!("Voice alert placed");
        } else {
            tracing::error!("Voice alert failed");
        }
        response.fire_detected = Some(true);
        response.alert_sent = Some(sent);
    } else {
        response.fire_detected = Some(false);
    }

    response.validation = Some(report);
    response.image_ref = Some(stored.file_name);
    Ok(Json(response))
}
