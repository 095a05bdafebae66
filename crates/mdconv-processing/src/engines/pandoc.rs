use super::{probe_version, run_process, CloudCredential, ConversionEngine, EngineError, EngineOutput};
use crate::assembler::AssembledDocument;
use async_trait::async_trait;
use mdconv_core::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

/// Word output through pandoc, markdown on stdin and docx on stdout.
pub struct PandocEngine {
    pandoc_path: String,
    reference_doc: Option<PathBuf>,
    timeout: Duration,
}

impl PandocEngine {
    pub fn new(pandoc_path: impl Into<String>, reference_doc: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            pandoc_path: pandoc_path.into(),
            reference_doc,
            timeout,
        }
    }

    /// Command-line arguments. The reference document is passed only when
    /// it exists on disk.
    pub async fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--from",
            "markdown",
            "--to",
            "docx",
            "--standalone",
            "--sandbox",
            "--output",
            "-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if let Some(template) = &self.reference_doc {
            match tokio::fs::try_exists(template).await {
                Ok(true) => args.push(format!("--reference-doc={}", template.display())),
                _ => tracing::warn!(
                    template = %template.display(),
                    "DOCX reference document not found, using pandoc defaults"
                ),
            }
        }

        args
    }
}

#[async_trait]
impl ConversionEngine for PandocEngine {
    fn format(&self) -> OutputFormat {
        OutputFormat::Docx
    }

    fn name(&self) -> &'static str {
        "pandoc"
    }

    async fn convert(
        &self,
        document: &AssembledDocument,
        _credential: Option<&CloudCredential>,
    ) -> Result<EngineOutput, EngineError> {
        let args = self.args().await;
        let bytes = run_process(
            &self.pandoc_path,
            &args,
            document.markdown.as_bytes(),
            self.timeout,
        )
        .await?;

        if bytes.is_empty() {
            return Err(EngineError::Failed("pandoc produced no output".to_string()));
        }

        Ok(EngineOutput::Document(bytes))
    }

    async fn version(&self) -> Result<String, EngineError> {
        probe_version(&self.pandoc_path).await
    }
}
