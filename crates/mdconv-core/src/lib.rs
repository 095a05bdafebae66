//! Core library for the markdown conversion service
//!
//! Domain models, error types, configuration and the path/filename sanitizer
//! shared by every other crate in the workspace.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod sanitize;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ConverterConfig, MetadataLimits};
pub use error::{AppError, ErrorMetadata, LogLevel, ValidationKind};
pub use models::{
    ArtifactDescriptor, ConversionJob, ConversionOutcome, DocumentMetadata, FormatStatus, JobId,
    OutputFormat, UnknownFormat,
};
