//! Error types module
//!
//! All failures that can reach a client are unified under [`AppError`]. Each
//! variant describes its own HTTP presentation through [`ErrorMetadata`], so the
//! API layer renders every error the same way (status, code, body, log level).

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like timeouts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "FILE_TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Reason an upload was rejected by input validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    NoFile,
    EmptyFilename,
    InvalidExtension,
    FileTooLarge,
    UnsupportedMediaType,
    BinaryContent,
    EmptyFile,
    InvalidFormat,
}

impl ValidationKind {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationKind::NoFile => "NO_FILE",
            ValidationKind::EmptyFilename => "EMPTY_FILENAME",
            ValidationKind::InvalidExtension => "INVALID_EXTENSION",
            ValidationKind::FileTooLarge => "FILE_TOO_LARGE",
            ValidationKind::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ValidationKind::BinaryContent => "BINARY_CONTENT",
            ValidationKind::EmptyFile => "EMPTY_FILE",
            ValidationKind::InvalidFormat => "INVALID_FORMAT",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ValidationKind::FileTooLarge => 413,
            ValidationKind::UnsupportedMediaType => 415,
            _ => 400,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed ({}): {message}", .kind.code())]
    Validation {
        kind: ValidationKind,
        message: String,
    },

    #[error("Metadata syntax error{}: {message}", .line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    MetadataSyntax {
        line: Option<usize>,
        message: String,
    },

    #[error("Authorization required for cloud documents")]
    AuthRequired { auth_url: String },

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation { kind, .. } => (
            kind.status_code(),
            kind.code(),
            false,
            Some("Upload a markdown, text or HTML file within the size limit"),
            false,
            LogLevel::Debug,
        ),
        AppError::MetadataSyntax { .. } => (
            400,
            "METADATA_SYNTAX_ERROR",
            false,
            Some("Fix the YAML front matter and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::AuthRequired { .. } => (
            401,
            "AUTH_REQUIRED",
            true,
            Some("Authorize access to cloud documents and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidJobId(_) => (
            400,
            "INVALID_JOB_ID",
            false,
            Some("Use the job id returned by the convert endpoint"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the job id and format"),
            false,
            LogLevel::Debug,
        ),
        AppError::Expired(_) => (
            410,
            "EXPIRED",
            false,
            Some("Convert the document again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Timeout(_) => (
            504,
            "TIMEOUT",
            true,
            Some("Retry with a smaller document or fewer formats"),
            false,
            LogLevel::Warn,
        ),
        AppError::ConversionFailed(_) => (
            500,
            "CONVERSION_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Validation { .. } => "Validation",
            AppError::MetadataSyntax { .. } => "MetadataSyntax",
            AppError::AuthRequired { .. } => "AuthRequired",
            AppError::InvalidJobId(_) => "InvalidJobId",
            AppError::NotFound(_) => "NotFound",
            AppError::Expired(_) => "Expired",
            AppError::Timeout(_) => "Timeout",
            AppError::ConversionFailed(_) => "ConversionFailed",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    pub fn validation(kind: ValidationKind, message: impl Into<String>) -> Self {
        AppError::Validation {
            kind,
            message: message.into(),
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Validation { ref message, .. } => message.clone(),
            AppError::MetadataSyntax { line, ref message } => match line {
                Some(line) => format!("Invalid front matter at line {}: {}", line, message),
                None => format!("Invalid front matter: {}", message),
            },
            AppError::AuthRequired { .. } => {
                "Authorization is required to create cloud documents".to_string()
            }
            AppError::InvalidJobId(_) => "Invalid job id".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Expired(ref msg) => msg.clone(),
            AppError::Timeout(_) => "Conversion timed out".to_string(),
            AppError::ConversionFailed(_) => "Conversion failed".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_file_too_large() {
        let err = AppError::validation(ValidationKind::FileTooLarge, "15728640 bytes exceeds max");
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "FILE_TOO_LARGE");
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_not_found_vs_expired() {
        let missing = AppError::NotFound("Job not found".to_string());
        let expired = AppError::Expired("Job expired".to_string());
        assert_eq!(missing.http_status_code(), 404);
        assert_eq!(expired.http_status_code(), 410);
        assert_eq!(missing.error_code(), "NOT_FOUND");
        assert_eq!(expired.error_code(), "EXPIRED");
    }

    #[test]
    fn test_metadata_syntax_message_carries_line() {
        let err = AppError::MetadataSyntax {
            line: Some(3),
            message: "did not find expected key".to_string(),
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "METADATA_SYNTAX_ERROR");
        assert!(err.client_message().contains("line 3"));
        assert!(err.to_string().contains("at line 3"));
    }

    #[test]
    fn test_internal_errors_are_sensitive() {
        let err = AppError::Storage("/var/lib/mdconv/abc: permission denied".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert!(!err.client_message().contains("/var/lib"));

        let err = AppError::from(anyhow::anyhow!("pandoc crashed"));
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_auth_required_and_timeout() {
        let err = AppError::AuthRequired {
            auth_url: "/auth/google/login".to_string(),
        };
        assert_eq!(err.http_status_code(), 401);
        assert!(err.is_recoverable());

        let err = AppError::Timeout("45s".to_string());
        assert_eq!(err.http_status_code(), 504);
        assert_eq!(err.log_level(), LogLevel::Warn);
    }
}
