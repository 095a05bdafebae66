//! Document processing for the markdown conversion service
//!
//! Upload validation, front matter handling, document assembly and the
//! conversion engines.

pub mod assembler;
pub mod engines;
pub mod front_matter;
pub mod metadata;
pub mod orchestrator;
pub mod validator;

pub use assembler::{AssembledDocument, DocumentAssembler, SourceKind};
pub use engines::{
    CloudCredential, ConversionEngine, EngineError, EngineOutput, GoogleDocsEngine, PandocEngine,
    WeasyPrintEngine,
};
pub use front_matter::{extract, render_front_matter, MetadataError};
pub use metadata::sanitize_metadata;
pub use orchestrator::{ConversionOrchestrator, EngineHealth, EngineResult};
pub use validator::{UploadCandidate, UploadValidator, ValidatedUpload, ValidationError};
