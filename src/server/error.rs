use crate::utils::error::FolioError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

impl FolioError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UserNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `{"error": "..."}` with the matching status.
pub fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for FolioError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                category = ?self.category(),
                severity = ?self.severity(),
                "Request failed: {}",
                self
            );
        } else {
            tracing::info!("Request rejected: {}", self);
        }
        error_body(status, self.to_string())
    }
}
