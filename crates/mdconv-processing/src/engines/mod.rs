//! Conversion engines
//!
//! One engine per output format. Local engines pipe the assembled document
//! through an external tool; the cloud engine uploads it.

mod google_docs;
mod pandoc;
mod process;
mod weasyprint;

pub use google_docs::GoogleDocsEngine;
pub use pandoc::PandocEngine;
pub use process::{probe_version, run_process};
pub use weasyprint::WeasyPrintEngine;

use crate::assembler::AssembledDocument;
use async_trait::async_trait;
use mdconv_core::OutputFormat;
use std::fmt;
use std::time::Duration;

/// Bearer credential for the cloud document service, supplied per request.
#[derive(Clone, PartialEq, Eq)]
pub struct CloudCredential(String);

impl CloudCredential {
    /// `None` for blank tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let token = token.trim();
        (!token.is_empty()).then(|| Self(token.to_string()))
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CloudCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CloudCredential(***)")
    }
}

/// What an engine produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    /// Artifact bytes to be stored under the job
    Document(Vec<u8>),
    /// Document created remotely; nothing to store
    Link { web_view_link: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Conversion failed: {0}")]
    Failed(String),

    #[error("Authorization required")]
    AuthRequired,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ConversionEngine: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;

    /// Whether the engine spawns a local process and so competes for the
    /// worker pool.
    fn is_local(&self) -> bool {
        true
    }

    async fn convert(
        &self,
        document: &AssembledDocument,
        credential: Option<&CloudCredential>,
    ) -> Result<EngineOutput, EngineError>;

    /// Version string of the underlying tool, used by health checks.
    async fn version(&self) -> Result<String, EngineError>;
}
