//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that
//! converts into `AppError` converts into `HttpAppError` too, so every failure
//! renders with the same status, body and log level.
//!
//! The body rendered here never carries details. The non-sensitive detailed
//! body rides along as an [`ErrorDetail`] extension and is swapped in by
//! [`error_body_middleware`](crate::middleware::error_body_middleware)
//! outside production.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use mdconv_core::{AppError, ErrorMetadata, LogLevel, ValidationKind};
use mdconv_processing::{MetadataError, ValidationError};
use mdconv_storage::StorageError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// HTTP status, repeated for clients that only see the body
    pub status: u16,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Line of the offending front matter, for metadata syntax errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Set when the client must authorize cloud access first
    #[serde(rename = "authRequired", skip_serializing_if = "Option::is_none")]
    pub auth_required: Option<bool>,
    /// Where to send the user to authorize
    #[serde(rename = "authUrl", skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn from_app_error(app_error: &AppError, include_details: bool) -> Self {
        let (line, auth_required, auth_url) = match app_error {
            AppError::MetadataSyntax { line, .. } => (*line, None, None),
            AppError::AuthRequired { auth_url } => (None, Some(true), Some(auth_url.clone())),
            _ => (None, None, None),
        };

        let (details, error_type) = if include_details {
            (
                Some(app_error.detailed_message()),
                Some(app_error.error_type().to_string()),
            )
        } else {
            (None, None)
        };

        Self {
            error: app_error.client_message(),
            details,
            error_type,
            code: app_error.error_code().to_string(),
            status: app_error.http_status_code(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
            line,
            auth_required,
            auth_url,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: both the trait and `AppError` live in other crates)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<MetadataError> for HttpAppError {
    fn from(err: MetadataError) -> Self {
        HttpAppError(err.into())
    }
}

/// A multipart body cut off by the size limit is an oversized upload;
/// anything else is a malformed request.
impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::validation(ValidationKind::FileTooLarge, "Upload exceeds the size limit")
        } else {
            AppError::InvalidInput(format!("Failed to read multipart body: {}", err.body_text()))
        };
        HttpAppError(app)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

/// Detailed body for a non-sensitive error, attached to the response
/// extensions.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub ErrorResponse);

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error, false);
        let mut response = (status, Json(body)).into_response();

        // Sensitive errors never get a detailed body
        if !app_error.is_sensitive() {
            response
                .extensions_mut()
                .insert(ErrorDetail(ErrorResponse::from_app_error(app_error, true)));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error_expired() {
        let HttpAppError(app_err) = StorageError::Expired("job expired".to_string()).into();
        assert!(matches!(app_err, AppError::Expired(_)));
        assert_eq!(app_err.http_status_code(), 410);
    }

    #[test]
    fn test_from_storage_error_io_is_sensitive() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "/var/data/secret path");
        let HttpAppError(app_err) = StorageError::IoError(io_err).into();
        assert!(matches!(app_err, AppError::Storage(_)));
        assert!(app_err.is_sensitive());

        let body = ErrorResponse::from_app_error(&app_err, false);
        assert!(!body.error.contains("/var/data"));
        assert!(body.details.is_none());
    }

    #[test]
    fn test_from_validation_error_file_too_large() {
        let HttpAppError(app_err) = ValidationError::FileTooLarge {
            size: 1000,
            max: 500,
        }
        .into();
        assert_eq!(app_err.error_code(), "FILE_TOO_LARGE");
        assert_eq!(app_err.http_status_code(), 413);
    }

    #[test]
    fn test_auth_required_body() {
        let app_err = AppError::AuthRequired {
            auth_url: "/auth/google/login".to_string(),
        };
        let json = serde_json::to_value(ErrorResponse::from_app_error(&app_err, true)).unwrap();

        assert_eq!(json["authRequired"], true);
        assert_eq!(json["authUrl"], "/auth/google/login");
        assert_eq!(json["code"], "AUTH_REQUIRED");
        assert_eq!(json["status"], 401);
    }

    #[test]
    fn test_metadata_syntax_carries_line() {
        let app_err = AppError::MetadataSyntax {
            line: Some(4),
            message: "did not find expected node content".to_string(),
        };
        let json = serde_json::to_value(ErrorResponse::from_app_error(&app_err, false)).unwrap();
        assert_eq!(json["line"], 4);
        assert_eq!(json["code"], "METADATA_SYNTAX_ERROR");
        assert!(json.get("authRequired").is_none());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse::from_app_error(&AppError::NotFound("job".to_string()), true);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["error"].is_string());
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["status"], 404);
        assert_eq!(json["recoverable"], false);
        assert!(json["timestamp"].is_string());
        assert_eq!(json["error_type"], "NotFound");
    }

    #[test]
    fn test_detailed_body_rides_in_extension() {
        let response =
            HttpAppError(AppError::NotFound("Job not found".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert!(detail.0.details.is_some());
    }

    #[test]
    fn test_sensitive_error_has_no_detail_extension() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "/var/data/secret path");
        let response = HttpAppError(StorageError::IoError(io_err).into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ErrorDetail>().is_none());
    }
}
