//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Body is not a valid alert (bad JSON, bad base64, missing fields)
    #[error("{0}")]
    InvalidPayload(String),

    /// Artifact could not be persisted
    #[error("{0}")]
    Storage(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::InvalidPayload(msg) => tracing::warn!("Rejected alert: {}", msg),
            AppError::Storage(msg) => tracing::error!("Storage error: {}", msg),
        }

        // Every failure is a 500 with the message, as the field clients expect
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::InvalidPayload(err.body_text())
    }
}

impl From<crate::storage::StorageError> for AppError {
    fn from(err: crate::storage::StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}
