//! License manager error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("Invalid owner data: {0}")]
    InvalidOwnerData(#[from] license_core::Error),

    #[error("Token not found")]
    NotFound,

    #[error("Token id already exists")]
    DuplicateId,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<rusqlite::Error> for LicenseError {
    fn from(e: rusqlite::Error) -> Self {
        LicenseError::Persistence(e.to_string())
    }
}

impl IntoResponse for LicenseError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LicenseError::InvalidOwnerData(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            LicenseError::NotFound => (StatusCode::NOT_FOUND, "Token not found".to_string()),
            LicenseError::DuplicateId => {
                tracing::error!("Token id collision persisted after retries");
                (StatusCode::CONFLICT, "Could not allocate a token id".to_string())
            }
            LicenseError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LicenseError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authorized".to_string()),
            LicenseError::Persistence(msg) => {
                tracing::error!("Persistence error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}
