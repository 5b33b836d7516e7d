use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::application::AppError;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameters(_)
            | AppError::InvalidParameter { .. }
            | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LedgerRejected { .. }
            | AppError::LedgerDeleteRejected { .. }
            | AppError::LedgerUnavailable(_)
            | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::MissingParameters(message) | AppError::NotFound(message) => {
                json!({ "error": message })
            }
            AppError::InvalidParameter { .. } | AppError::InvalidPayload(_) => {
                json!({ "error": self.to_string() })
            }
            AppError::LedgerRejected {
                status: remote,
                details,
            } => {
                error!(remote_status = remote, "gLedger create rejected");
                json!({
                    "error": "Failed to create gLedger record",
                    "status": remote,
                    "details": details,
                })
            }
            AppError::LedgerDeleteRejected {
                status: remote,
                details,
            } => {
                error!(remote_status = remote, "gLedger delete rejected");
                json!({
                    "error": "Failed to delete gLedger record",
                    "status": remote,
                    "details": details,
                })
            }
            AppError::LedgerUnavailable(_) | AppError::Database(_) => {
                error!(error = %self, "request failed");
                json!({
                    "error": "Internal server error",
                    "message": self.to_string(),
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
