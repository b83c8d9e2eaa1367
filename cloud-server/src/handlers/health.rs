//! Collector readiness: artifact directory, validation stages, voice alerts

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use firesentinel_core::logic::validation::FailPolicy;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    storage: StorageHealth,
    validation: ValidationHealth,
    voice_alerts: bool,
}

#[derive(Serialize)]
pub struct StorageHealth {
    dir: String,
    writable: bool,
}

#[derive(Serialize)]
pub struct ValidationHealth {
    stages: Vec<String>,
    fail_policy: FailPolicy,
}

/// 503 when received alerts could not be stored
pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let writable = state.store.is_writable().await;
    if !writable {
        tracing::warn!("Artifact directory {} is not writable", state.store.dir().display());
    }

    let (code, status) = if writable {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().timestamp(),
            storage: StorageHealth {
                dir: state.store.dir().display().to_string(),
                writable,
            },
            validation: ValidationHealth {
                stages: state.cascade.stage_names(),
                fail_policy: state.cascade.policy(),
            },
            voice_alerts: state.dispatcher.has_notifier(),
        }),
    )
}
