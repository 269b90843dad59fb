//! Centralized error handling module.

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Application-wide error type.
///
/// All errors in the application should be converted to this type
/// for consistent error handling and reporting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or wrong API key (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found error (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (422)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Redis pool error
    #[error("Cache pool error: {0}")]
    RedisPool(#[from] deadpool_redis::PoolError),
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable reason
    pub detail: String,
}

impl AppError {
    /// HTTP status and client-facing message for this error.
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Database(e) => {
                tracing::error!("Database error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            Self::Migration(e) => {
                tracing::error!("Migration error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database migration error".to_string(),
                )
            }
            Self::RedisPool(e) => {
                tracing::error!("Redis pool error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Cache connection error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();

        // Report error to Sentry for server errors
        if status.is_server_error() {
            sentry::capture_error(&self);
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting validation errors.
pub trait ValidationErrorExt {
    fn to_validation_error(&self) -> AppError;
}

impl ValidationErrorExt for validator::ValidationErrors {
    fn to_validation_error(&self) -> AppError {
        // Get the first field error for a clean message
        if let Some((field, errors)) = self.field_errors().iter().next() {
            if let Some(error) = errors.first() {
                let message = error.message.as_ref().map_or_else(
                    || {
                        format!(
                            "Validation failed on field '{field}' with tag '{}'",
                            error.code
                        )
                    },
                    std::string::ToString::to_string,
                );
                return AppError::Validation(message);
            }
        }
        AppError::Validation(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_app_error_display() {
        assert_eq!(
            AppError::Forbidden("Invalid API key".to_string()).to_string(),
            "Forbidden: Invalid API key"
        );
        assert_eq!(
            AppError::NotFound("Organization not found".to_string()).to_string(),
            "Not found: Organization not found"
        );
        assert_eq!(
            AppError::Validation("radius".to_string()).to_string(),
            "Validation error: radius"
        );
    }

    #[tokio::test]
    async fn test_status_codes() {
        let cases = [
            (AppError::Forbidden(String::new()), StatusCode::FORBIDDEN),
            (AppError::NotFound(String::new()), StatusCode::NOT_FOUND),
            (
                AppError::Validation(String::new()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Internal(String::new()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_error_response_body_has_detail() {
        let response = AppError::NotFound("Organization not found".to_string()).into_response();

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(parsed["detail"], "Organization not found");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["detail"], "Database error occurred");
    }

    #[test]
    fn test_validation_error_ext_empty_errors() {
        let errors = validator::ValidationErrors::new();
        assert!(matches!(
            errors.to_validation_error(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_validation_error_ext_uses_field_message() {
        let mut errors = validator::ValidationErrors::new();
        let mut error = validator::ValidationError::new("range");
        error.message = Some("radius must be greater than 0".into());
        errors.add("radius", error);

        match errors.to_validation_error() {
            AppError::Validation(msg) => assert_eq!(msg, "radius must be greater than 0"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_error_ext_without_message() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("lat", validator::ValidationError::new("finite"));

        match errors.to_validation_error() {
            AppError::Validation(msg) => {
                assert!(msg.contains("'lat'"));
                assert!(msg.contains("'finite'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
