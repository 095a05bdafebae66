use crate::traits::{
    ByteStream, JobStore, ResolvedArtifact, StorageError, StorageResult, SweepReport,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use mdconv_core::constants::{ARTIFACT_STEM, JOB_RECORD_FILE, TOMBSTONE_DIR, TRASH_DIR};
use mdconv_core::{ArtifactDescriptor, ConversionJob, FormatStatus, JobId, OutputFormat};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Local filesystem job store
///
/// Layout under the root:
/// - `<job_id>/job.json` persisted job record
/// - `<job_id>/document.<ext>` artifacts
/// - `.expired/<job_id>` tombstones of swept jobs
/// - `.trash/` staging area for atomic deletion
#[derive(Clone)]
pub struct LocalJobStore {
    root: PathBuf,
    retention: Duration,
    tombstone_retention: Duration,
    record_lock: Arc<Mutex<()>>,
}

impl LocalJobStore {
    /// Create a new LocalJobStore, creating the root and its bookkeeping
    /// directories when missing.
    pub async fn new(
        root: impl Into<PathBuf>,
        retention: Duration,
        tombstone_retention: Duration,
    ) -> StorageResult<Self> {
        let root = root.into();

        for dir in [root.clone(), root.join(TOMBSTONE_DIR), root.join(TRASH_DIR)] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(LocalJobStore {
            root,
            retention,
            tombstone_retention,
            record_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn parse_id(job_id: &str) -> StorageResult<JobId> {
        JobId::parse(job_id).map_err(|_| StorageError::InvalidJobId("malformed job id".to_string()))
    }

    /// Directory of a job. Only ever built from a validated [`JobId`].
    fn job_dir(&self, id: &JobId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn tombstone_path(&self, id: &JobId) -> PathBuf {
        self.root.join(TOMBSTONE_DIR).join(id.to_string())
    }

    fn artifact_name(format: OutputFormat) -> Option<String> {
        format
            .extension()
            .map(|ext| format!("{}.{}", ARTIFACT_STEM, ext))
    }

    async fn tombstone_exists(&self, id: &JobId) -> bool {
        fs::try_exists(self.tombstone_path(id)).await.unwrap_or(false)
    }

    /// Distinguish a vanished job directory: swept (`Expired`) or never existed.
    async fn missing_job_error(&self, id: &JobId) -> StorageError {
        if self.tombstone_exists(id).await {
            StorageError::Expired("Job has expired".to_string())
        } else {
            StorageError::NotFound("Job not found".to_string())
        }
    }

    /// Write `data` to `path` via a temporary sibling and rename, so readers
    /// never observe a partially written file.
    async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::WriteFailed("Invalid target path".to_string()))?;
        let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", tmp.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", tmp.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", tmp.display(), e))
        })?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to move file into place {}: {}",
                path.display(),
                e
            )));
        }

        Ok(())
    }

    async fn read_record(&self, id: &JobId) -> StorageResult<ConversionJob> {
        let path = self.job_dir(id).join(JOB_RECORD_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound("Job not found".to_string()));
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read job record {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::CorruptRecord(format!("{}: {}", path.display(), e)))
    }

    async fn write_record(&self, job: &ConversionJob) -> StorageResult<()> {
        let path = self.job_dir(&job.id).join(JOB_RECORD_FILE);
        let data = serde_json::to_vec_pretty(job)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to encode job record: {}", e)))?;
        Self::write_atomic(&path, &data).await
    }

    /// Read-modify-write of a job record, serialized across tasks.
    async fn update_record<F>(&self, id: &JobId, update: F) -> StorageResult<ConversionJob>
    where
        F: FnOnce(&mut ConversionJob) + Send,
    {
        let _guard = self.record_lock.lock().await;
        let mut job = match self.read_record(id).await {
            Ok(job) => job,
            Err(StorageError::NotFound(_)) => return Err(self.missing_job_error(id).await),
            Err(e) => return Err(e),
        };
        update(&mut job);
        self.write_record(&job).await?;
        Ok(job)
    }

    /// Create a job with an explicit creation time.
    pub async fn create_at(
        &self,
        formats: Vec<OutputFormat>,
        content_sha256: String,
        download_stem: String,
        created_at: DateTime<Utc>,
    ) -> StorageResult<ConversionJob> {
        let job = ConversionJob::new(formats, content_sha256, download_stem, created_at);
        let dir = self.job_dir(&job.id);

        // Must not already exist; job directories are never reused
        fs::create_dir(&dir).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create job directory {}: {}", dir.display(), e))
        })?;
        self.write_record(&job).await?;

        tracing::info!(
            job_id = %job.id,
            formats = ?job.formats,
            "Job created"
        );

        Ok(job)
    }

    /// Resolve an artifact as of `now`.
    pub async fn resolve_at(
        &self,
        job_id: &str,
        format: OutputFormat,
        now: DateTime<Utc>,
    ) -> StorageResult<ResolvedArtifact> {
        let id = Self::parse_id(job_id)?;

        let job = match self.read_record(&id).await {
            Ok(job) => job,
            Err(StorageError::NotFound(_)) => return Err(self.missing_job_error(&id).await),
            Err(e) => return Err(e),
        };

        if job.is_expired(now, self.retention) {
            return Err(StorageError::Expired("Job has expired".to_string()));
        }

        let (size, content_type) = match job.results.get(&format) {
            Some(FormatStatus::Stored { size, content_type }) => (*size, content_type.clone()),
            _ => {
                return Err(StorageError::NotFound(format!(
                    "No {} artifact for this job",
                    format
                )));
            }
        };

        let name = Self::artifact_name(format)
            .ok_or_else(|| StorageError::NotFound(format!("No {} artifact for this job", format)))?;
        if !fs::try_exists(self.job_dir(&id).join(name)).await.unwrap_or(false) {
            return Err(self.missing_job_error(&id).await);
        }

        let download_name = job
            .download_filename(format)
            .ok_or_else(|| StorageError::NotFound(format!("No {} artifact for this job", format)))?;

        Ok(ResolvedArtifact {
            job_id: id,
            format,
            download_name,
            size,
            content_type,
        })
    }

    /// Tombstone the job, move its directory into the trash, then remove it.
    async fn expire_job(&self, id: &JobId, created_at: Option<DateTime<Utc>>) -> StorageResult<()> {
        let marker = created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        Self::write_atomic(&self.tombstone_path(id), marker.as_bytes()).await?;

        let trash = self
            .root
            .join(TRASH_DIR)
            .join(format!("{}-{}", id, Uuid::new_v4().simple()));
        fs::rename(self.job_dir(id), &trash).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to move job {} to trash: {}", id, e))
        })?;

        fs::remove_dir_all(&trash).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to remove {}: {}", trash.display(), e))
        })?;

        Ok(())
    }

    async fn empty_trash(&self) -> usize {
        let trash = self.root.join(TRASH_DIR);
        let mut removed = 0;
        let Ok(mut entries) = fs::read_dir(&trash).await else {
            return 0;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let result = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => fs::remove_dir_all(&path).await,
                _ => fs::remove_file(&path).await,
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to empty trash entry")
                }
            }
        }

        removed
    }

    async fn purge_tombstones(&self, now: DateTime<Utc>) -> usize {
        let dir = self.root.join(TOMBSTONE_DIR);
        let mut purged = 0;
        let Ok(mut entries) = fs::read_dir(&dir).await else {
            return 0;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(_) => continue,
            };

            if now - modified >= self.tombstone_retention
                && fs::remove_file(entry.path()).await.is_ok()
            {
                purged += 1;
            }
        }

        purged
    }
}

#[async_trait]
impl JobStore for LocalJobStore {
    async fn create(
        &self,
        formats: Vec<OutputFormat>,
        content_sha256: String,
        download_stem: String,
    ) -> StorageResult<ConversionJob> {
        self.create_at(formats, content_sha256, download_stem, Utc::now())
            .await
    }

    async fn store(
        &self,
        job_id: &str,
        format: OutputFormat,
        data: Vec<u8>,
    ) -> StorageResult<ArtifactDescriptor> {
        let id = Self::parse_id(job_id)?;
        let name = Self::artifact_name(format).ok_or_else(|| {
            StorageError::WriteFailed(format!("Format {} has no stored artifact", format))
        })?;
        let content_type = format.content_type().unwrap_or("application/octet-stream");

        let dir = self.job_dir(&id);
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(self.missing_job_error(&id).await);
        }

        let start = std::time::Instant::now();
        let size = data.len() as u64;
        Self::write_atomic(&dir.join(&name), &data).await?;

        let job = self
            .update_record(&id, |job| {
                job.results.insert(
                    format,
                    FormatStatus::Stored {
                        size,
                        content_type: content_type.to_string(),
                    },
                );
            })
            .await?;

        tracing::info!(
            job_id = %id,
            format = %format,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact stored"
        );

        Ok(ArtifactDescriptor {
            format,
            filename: job.download_filename(format).unwrap_or(name),
            size,
            content_type: content_type.to_string(),
        })
    }

    async fn record(
        &self,
        job_id: &str,
        format: OutputFormat,
        status: FormatStatus,
    ) -> StorageResult<()> {
        let id = Self::parse_id(job_id)?;
        self.update_record(&id, |job| {
            job.results.insert(format, status);
        })
        .await?;
        Ok(())
    }

    async fn load(&self, job_id: &str) -> StorageResult<ConversionJob> {
        let id = Self::parse_id(job_id)?;
        match self.read_record(&id).await {
            Err(StorageError::NotFound(_)) => Err(self.missing_job_error(&id).await),
            other => other,
        }
    }

    async fn resolve(
        &self,
        job_id: &str,
        format: OutputFormat,
    ) -> StorageResult<ResolvedArtifact> {
        self.resolve_at(job_id, format, Utc::now()).await
    }

    async fn download_stream(&self, artifact: &ResolvedArtifact) -> StorageResult<ByteStream> {
        let name = Self::artifact_name(artifact.format)
            .ok_or_else(|| StorageError::NotFound("No artifact for this format".to_string()))?;
        let path = self.job_dir(&artifact.job_id).join(name);

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(self.missing_job_error(&artifact.job_id).await);
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let job_id = artifact.job_id;
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(job_id = %job_id, error = %e, "Artifact stream read error");
                StorageError::ReadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    #[tracing::instrument(skip(self), fields(sweep.root = %self.root.display()))]
    async fn sweep(&self, now: DateTime<Utc>) -> StorageResult<SweepReport> {
        let mut report = SweepReport::default();

        let leftovers = self.empty_trash().await;
        if leftovers > 0 {
            tracing::debug!(leftovers, "Removed leftover trash entries");
        }

        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                report.skipped += 1;
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            // Only directories created by this store (canonical job ids) are ever touched
            let Ok(id) = JobId::parse(name) else {
                report.skipped += 1;
                continue;
            };
            if !entry.file_type().await.map(|ft| ft.is_dir()).unwrap_or(false) {
                report.skipped += 1;
                continue;
            }

            report.scanned += 1;

            let (expired, created_at) = match self.read_record(&id).await {
                Ok(job) => (job.is_expired(now, self.retention), Some(job.created_at)),
                Err(e) => {
                    // Orphans (no readable record) fall back to the directory mtime
                    // with a doubled window.
                    let modified = entry
                        .metadata()
                        .await
                        .and_then(|m| m.modified())
                        .map(DateTime::<Utc>::from);
                    match modified {
                        Ok(modified) => {
                            tracing::warn!(job_id = %id, error = %e, "Job record unreadable, using directory age");
                            (now - modified >= self.retention * 2, None)
                        }
                        Err(_) => {
                            report.failed += 1;
                            continue;
                        }
                    }
                }
            };

            if !expired {
                report.kept += 1;
                continue;
            }

            match self.expire_job(&id, created_at).await {
                Ok(()) => {
                    tracing::info!(job_id = %id, created_at = ?created_at, "Deleted expired job");
                    report.deleted += 1;
                }
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "Failed to delete expired job");
                    report.failed += 1;
                }
            }
        }

        report.tombstones_purged = self.purge_tombstones(now).await;

        Ok(report)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StorageError::ConfigError(
                "Storage root is not a directory".to_string(),
            ));
        }
        Ok(())
    }
}
