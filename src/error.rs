use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::upload::UploadError;

#[derive(Debug, thiserror::Error)]
#[allow(dead_code)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upload failed")]
    UploadFailed,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UploadError> for AppError {
    fn from(_: UploadError) -> Self {
        // Callers log the gateway detail; clients only see success or
        // failure.
        AppError::UploadFailed
    }
}

/// Every error renders as `{"success": false, "message": ...}` so the
/// client can always read one shape. Expected failures keep their specific
/// message; unexpected ones are logged here and collapsed to a generic
/// message so no internal detail leaks.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid phone or password".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::UploadFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Image upload failed".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_returns_400() {
        assert_eq!(
            response_status(AppError::Validation("missing field".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflict_returns_409() {
        assert_eq!(
            response_status(AppError::Conflict("phone taken".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn unauthorized_returns_401() {
        assert_eq!(
            response_status(AppError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            response_status(AppError::NotFound("no such user".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn upload_failure_returns_500() {
        assert_eq!(
            response_status(AppError::UploadFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upload_error_collapses_to_upload_failed() {
        let err: AppError = UploadError::EmptyImage.into();
        assert!(matches!(err, AppError::UploadFailed));
    }

    #[test]
    fn error_body_is_json() {
        let response = AppError::Unauthorized.into_response();
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .unwrap();
        assert_eq!(content_type, "application/json");
    }
}
