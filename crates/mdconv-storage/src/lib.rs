//! Job storage for the conversion service
//!
//! Owns job directories and their artifacts from creation until the sweep
//! removes them. Job directories are named by their [`JobId`](mdconv_core::JobId)
//! and nothing else.

pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalJobStore;
pub use traits::{
    ByteStream, JobStore, ResolvedArtifact, StorageError, StorageResult, SweepReport,
};
