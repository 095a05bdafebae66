//! Upload validation
//!
//! Pure decision function over a candidate upload. Checks run in a fixed order
//! and stop at the first failure so the rejection reason is deterministic.

use mdconv_core::sanitize::{file_extension, sanitize_filename};
use mdconv_core::{AppError, ValidationKind};

/// Number of leading bytes inspected by the binary-content heuristic.
pub const BINARY_SNIFF_LEN: usize = 8192;

/// Validation errors for uploaded documents
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No file provided")]
    NoFile,

    #[error("Filename is empty")]
    EmptyFilename,

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Empty file")]
    EmptyFile,

    #[error("Unsupported content type: {content_type} (allowed: {allowed:?})")]
    UnsupportedContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File appears to contain binary content")]
    BinaryContent,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationKind {
        match self {
            ValidationError::NoFile => ValidationKind::NoFile,
            ValidationError::EmptyFilename => ValidationKind::EmptyFilename,
            ValidationError::InvalidExtension { .. } => ValidationKind::InvalidExtension,
            ValidationError::FileTooLarge { .. } => ValidationKind::FileTooLarge,
            ValidationError::EmptyFile => ValidationKind::EmptyFile,
            ValidationError::UnsupportedContentType { .. } => ValidationKind::UnsupportedMediaType,
            ValidationError::BinaryContent => ValidationKind::BinaryContent,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let message = match &err {
            ValidationError::FileTooLarge { size, max } => {
                format!("File size {} bytes exceeds maximum of {} bytes", size, max)
            }
            ValidationError::InvalidExtension { allowed, .. } => {
                format!("Invalid file type. Allowed: {}", allowed.join(", "))
            }
            ValidationError::UnsupportedContentType {
                content_type,
                allowed,
            } => format!(
                "Unsupported content type '{}'. Allowed: {}",
                content_type,
                allowed.join(", ")
            ),
            other => other.to_string(),
        };
        AppError::validation(err.kind(), message)
    }
}

/// An upload as received, before any checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadCandidate<'a> {
    pub filename: Option<&'a str>,
    /// Size announced by the client, when known ahead of the bytes.
    pub declared_size: Option<usize>,
    pub data: Option<&'a [u8]>,
}

/// An accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Sanitized name, safe for logging. Never persisted.
    pub filename: String,
    pub extension: String,
    pub content_type: &'static str,
    pub size: usize,
    pub text: String,
}

impl ValidatedUpload {
    pub fn is_html(&self) -> bool {
        self.content_type == "text/html"
    }
}

/// Document upload validator
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Run every check in order, returning the first failure.
    pub fn validate(&self, candidate: &UploadCandidate<'_>) -> Result<ValidatedUpload, ValidationError> {
        let data = candidate.data.ok_or(ValidationError::NoFile)?;

        let raw_name = candidate.filename.map(str::trim).unwrap_or_default();
        if raw_name.is_empty() {
            return Err(ValidationError::EmptyFilename);
        }
        let filename = sanitize_filename(raw_name);

        let extension = self.validate_extension(&filename)?;

        let size = candidate.declared_size.unwrap_or(0).max(data.len());
        self.validate_file_size(size)?;

        let content_type = sniff_content_type(data, Some(&extension));
        self.validate_content_type(content_type)?;

        if contains_nul(data) {
            return Err(ValidationError::BinaryContent);
        }

        let text = String::from_utf8_lossy(data).into_owned();

        let suspicious = scan_suspicious_patterns(&text);
        if !suspicious.is_empty() {
            tracing::warn!(
                filename = %filename,
                patterns = ?suspicious,
                "Upload contains potentially active content"
            );
        }

        Ok(ValidatedUpload {
            filename,
            extension,
            content_type,
            size,
            text,
        })
    }

    /// Validate file extension against the allow-list
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = file_extension(filename).unwrap_or_default();

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        Ok(())
    }

    /// Validate the sniffed content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::UnsupportedContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }
}

fn contains_nul(data: &[u8]) -> bool {
    data[..data.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

/// Content type from magic bytes, falling back to a text subtype for valid
/// UTF-8. The extension only picks between text subtypes.
pub fn sniff_content_type(data: &[u8], extension: Option<&str>) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\xD0\xCF\x11\xE0", "application/x-ole-storage"),
        (b"\x89PNG", "image/png"),
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"GIF8", "image/gif"),
        (b"\x7FELF", "application/x-executable"),
        (b"\x1F\x8B", "application/gzip"),
        (b"\0asm", "application/wasm"),
        (b"MZ", "application/x-msdownload"),
    ];

    if let Some((_, content_type)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(magic)) {
        return content_type;
    }

    let body = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let Ok(text) = std::str::from_utf8(body) else {
        return "application/octet-stream";
    };

    let head: String = text
        .trim_start()
        .chars()
        .take(32)
        .collect::<String>()
        .to_lowercase();
    let html_extension = matches!(extension, Some("html") | Some("htm"));

    if head.starts_with("<!doctype html") || head.starts_with("<html") || html_extension {
        "text/html"
    } else if matches!(extension, Some("md") | Some("markdown")) {
        "text/markdown"
    } else {
        "text/plain"
    }
}

/// Patterns that hint at active content. Logged, not rejected.
pub fn scan_suspicious_patterns(text: &str) -> Vec<&'static str> {
    const PATTERNS: &[&str] = &["<script", "javascript:", "onerror=", "onload=", "eval(", "exec("];

    let lowered = text.to_lowercase();
    PATTERNS
        .iter()
        .copied()
        .filter(|p| lowered.contains(p))
        .collect()
}
