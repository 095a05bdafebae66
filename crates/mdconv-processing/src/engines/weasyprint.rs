use super::{probe_version, run_process, CloudCredential, ConversionEngine, EngineError, EngineOutput};
use crate::assembler::AssembledDocument;
use async_trait::async_trait;
use mdconv_core::OutputFormat;
use std::path::Path;
use std::time::Duration;

/// PDF magic bytes
const PDF_SIGNATURE: &[u8] = b"%PDF";

/// PDF output through WeasyPrint, HTML on stdin and PDF on stdout.
pub struct WeasyPrintEngine {
    weasyprint_path: String,
    timeout: Duration,
}

impl WeasyPrintEngine {
    pub fn new(weasyprint_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            weasyprint_path: weasyprint_path.into(),
            timeout,
        }
    }

    /// Relative references resolve against `base_url`, an empty directory
    /// owned by the conversion.
    pub fn args(base_url: &Path) -> Vec<String> {
        vec![
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--base-url".to_string(),
            base_url.display().to_string(),
            "-".to_string(),
            "-".to_string(),
        ]
    }
}

#[async_trait]
impl ConversionEngine for WeasyPrintEngine {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn name(&self) -> &'static str {
        "weasyprint"
    }

    async fn convert(
        &self,
        document: &AssembledDocument,
        _credential: Option<&CloudCredential>,
    ) -> Result<EngineOutput, EngineError> {
        let base_dir = tempfile::tempdir()
            .map_err(|e| EngineError::Failed(format!("Failed to create base directory: {}", e)))?;

        let bytes = run_process(
            &self.weasyprint_path,
            &Self::args(base_dir.path()),
            document.html.as_bytes(),
            self.timeout,
        )
        .await?;

        if !bytes.starts_with(PDF_SIGNATURE) {
            return Err(EngineError::Failed(
                "weasyprint output is not a PDF document".to_string(),
            ));
        }

        Ok(EngineOutput::Document(bytes))
    }

    async fn version(&self) -> Result<String, EngineError> {
        probe_version(&self.weasyprint_path).await
    }
}
