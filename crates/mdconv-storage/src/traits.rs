//! Job store abstraction
//!
//! This module defines the JobStore trait that owns every job directory and
//! its artifacts for the whole retention window.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use mdconv_core::{
    AppError, ArtifactDescriptor, ConversionJob, FormatStatus, JobId, OutputFormat,
};
use std::pin::Pin;
use thiserror::Error;

/// Job storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Corrupt job record: {0}")]
    CorruptRecord(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidJobId(msg) => AppError::InvalidJobId(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::Expired(msg) => AppError::Expired(msg),
            StorageError::WriteFailed(msg)
            | StorageError::ReadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::CorruptRecord(msg)
            | StorageError::ConfigError(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
        }
    }
}

/// A downloadable artifact located by [`JobStore::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub job_id: JobId,
    pub format: OutputFormat,
    pub download_name: String,
    pub size: u64,
    pub content_type: String,
}

/// Counters from one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub kept: usize,
    pub skipped: usize,
    pub failed: usize,
    pub tombstones_purged: usize,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Job lifecycle storage
///
/// Every method taking a raw `job_id` re-validates it before touching the
/// backing store, so a forged identifier never reaches a path join.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a fresh job with a new random identifier and persist its record.
    async fn create(
        &self,
        formats: Vec<OutputFormat>,
        content_sha256: String,
        download_stem: String,
    ) -> StorageResult<ConversionJob>;

    /// Persist the bytes of one format's artifact under the job.
    async fn store(
        &self,
        job_id: &str,
        format: OutputFormat,
        data: Vec<u8>,
    ) -> StorageResult<ArtifactDescriptor>;

    /// Record a non-artifact outcome (link, failure, auth required) for a format.
    async fn record(
        &self,
        job_id: &str,
        format: OutputFormat,
        status: FormatStatus,
    ) -> StorageResult<()>;

    /// Load the persisted job record.
    async fn load(&self, job_id: &str) -> StorageResult<ConversionJob>;

    /// Locate a stored artifact. Distinguishes a job that never existed
    /// (`NotFound`) from one past its retention window (`Expired`).
    async fn resolve(&self, job_id: &str, format: OutputFormat)
        -> StorageResult<ResolvedArtifact>;

    /// Stream a resolved artifact's bytes. Never mutates the artifact.
    async fn download_stream(&self, artifact: &ResolvedArtifact) -> StorageResult<ByteStream>;

    /// Delete every job whose persisted creation time is older than the
    /// retention window.
    async fn sweep(&self, now: DateTime<Utc>) -> StorageResult<SweepReport>;

    /// Cheap reachability check for health reporting.
    async fn health_check(&self) -> StorageResult<()>;
}
