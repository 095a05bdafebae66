//! Service-wide constants

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "markdown-converter";

/// Crate version reported by the health endpoint.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sidecar file holding the persisted job record.
pub const JOB_RECORD_FILE: &str = "job.json";

/// Stem of every stored artifact (`document.docx`, `document.pdf`).
pub const ARTIFACT_STEM: &str = "document";

/// Directory (under the storage root) holding expiry tombstones.
pub const TOMBSTONE_DIR: &str = ".expired";

/// Directory (under the storage root) jobs are moved into before deletion.
pub const TRASH_DIR: &str = ".trash";
