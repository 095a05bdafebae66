use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::format::OutputFormat;
use crate::error::AppError;

/// Opaque job identifier. Also the name of the job's storage directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Fresh random (v4) identifier.
    pub fn generate() -> Self {
        JobId(Uuid::new_v4())
    }

    /// Accepts only the canonical lowercase hyphenated v4 form produced by
    /// [`JobId::generate`]. Anything else is rejected before it can be joined
    /// onto a filesystem path.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.len() != 36 {
            return Err(AppError::InvalidJobId("unexpected length".to_string()));
        }

        let uuid = Uuid::try_parse(raw)
            .map_err(|_| AppError::InvalidJobId("not a uuid".to_string()))?;

        if uuid.get_version_num() != 4 || uuid.hyphenated().to_string() != raw {
            return Err(AppError::InvalidJobId("not a canonical job id".to_string()));
        }

        Ok(JobId(uuid))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Per-format state recorded in the job sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FormatStatus {
    Pending,
    Stored { size: u64, content_type: String },
    Linked { web_view_link: String },
    Failed { reason: String },
    AuthRequired,
}

/// Persisted record of a conversion job (`job.json` inside the job directory).
///
/// The uploaded file's real name is never stored; `content_sha256` identifies
/// the source and `download_stem` is already sanitized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: JobId,
    pub created_at: DateTime<Utc>,
    pub content_sha256: String,
    pub download_stem: String,
    pub formats: Vec<OutputFormat>,
    #[serde(default)]
    pub results: BTreeMap<OutputFormat, FormatStatus>,
}

impl ConversionJob {
    pub fn new(
        formats: Vec<OutputFormat>,
        content_sha256: String,
        download_stem: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let results = formats
            .iter()
            .map(|format| (*format, FormatStatus::Pending))
            .collect();

        Self {
            id: JobId::generate(),
            created_at,
            content_sha256,
            download_stem,
            formats,
            results,
        }
    }

    pub fn expires_at(&self, retention: Duration) -> DateTime<Utc> {
        self.created_at + retention
    }

    /// A job is expired once its full retention window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        now >= self.expires_at(retention)
    }

    pub fn download_filename(&self, format: OutputFormat) -> Option<String> {
        format
            .extension()
            .map(|ext| format!("{}.{}", self.download_stem, ext))
    }
}

/// A stored artifact as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArtifactDescriptor {
    pub format: OutputFormat,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Outcome of converting one document into one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Stored(ArtifactDescriptor),
    Linked { web_view_link: String },
    Failed { reason: String },
    AuthRequired { auth_url: String },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ConversionOutcome::Stored(_) | ConversionOutcome::Linked { .. }
        )
    }

    pub fn status(&self) -> FormatStatus {
        match self {
            ConversionOutcome::Stored(artifact) => FormatStatus::Stored {
                size: artifact.size,
                content_type: artifact.content_type.clone(),
            },
            ConversionOutcome::Linked { web_view_link } => FormatStatus::Linked {
                web_view_link: web_view_link.clone(),
            },
            ConversionOutcome::Failed { reason } => FormatStatus::Failed {
                reason: reason.clone(),
            },
            ConversionOutcome::AuthRequired { .. } => FormatStatus::AuthRequired,
        }
    }
}
