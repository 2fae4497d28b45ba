//! Maps `strym_core::AppError` onto the `{"error": {...}}` envelope (§6, §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use strym_core::AppError;

/// Wraps `AppError` so it can be returned directly from a handler.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self.0 {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, None),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, None),
            AppError::RateLimit { retry_after } => (StatusCode::TOO_MANY_REQUESTS, Some(*retry_after)),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        let mut body = json!({
            "error": {
                "message": self.0.to_string(),
                "type": self.0.kind(),
                "timestamp": Utc::now(),
            }
        });

        if let Some(retry_after) = retry_after {
            body["error"]["retry_after"] = json!(retry_after);
        }

        (status, Json(body)).into_response()
    }
}

/// Renders a validation error directly from a JSON extraction failure
/// (malformed body, unknown severity literal, etc.) using the same envelope.
pub fn validation_response(message: impl Into<String>) -> Response {
    ApiError(AppError::validation(message)).into_response()
}
