//! Test helpers: build AppState and router for integration tests.
//!
//! Engines are fakes so no external tools are needed. The fake PDF engine
//! echoes the assembled HTML after a PDF header and the fake DOCX engine
//! echoes the assembled markdown after a zip header, so tests can inspect what
//! reached the engine by downloading the artifact.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use mdconv_api::setup::{routes, services};
use mdconv_api::state::AppState;
use mdconv_core::{BaseConfig, Config, ConverterConfig, MetadataLimits, OutputFormat};
use mdconv_processing::{
    AssembledDocument, CloudCredential, ConversionEngine, ConversionOrchestrator, EngineError,
    EngineOutput,
};
use mdconv_storage::{JobStore, LocalJobStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const CLOUD_TOKEN_HEADER: &str = "X-Cloud-Access-Token";
pub const REJECTED_TOKEN: &str = "revoked-token";
pub const AUTH_URL: &str = "/auth/google/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Echo,
    Fail,
    Slow(Duration),
}

/// Stand-in for pandoc, weasyprint and the Drive client.
pub struct FakeEngine {
    pub format: OutputFormat,
    pub behavior: Behavior,
}

impl FakeEngine {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            behavior: Behavior::Echo,
        }
    }

    pub fn failing(format: OutputFormat) -> Self {
        Self {
            format,
            behavior: Behavior::Fail,
        }
    }

    pub fn slow(format: OutputFormat, delay: Duration) -> Self {
        Self {
            format,
            behavior: Behavior::Slow(delay),
        }
    }
}

#[async_trait]
impl ConversionEngine for FakeEngine {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn name(&self) -> &'static str {
        match self.format {
            OutputFormat::Docx => "pandoc",
            OutputFormat::Pdf => "weasyprint",
            OutputFormat::Gdocs => "google-docs",
        }
    }

    fn is_local(&self) -> bool {
        self.format != OutputFormat::Gdocs
    }

    async fn convert(
        &self,
        document: &AssembledDocument,
        credential: Option<&CloudCredential>,
    ) -> Result<EngineOutput, EngineError> {
        match self.behavior {
            Behavior::Fail => return Err(EngineError::Failed("exit status 43".to_string())),
            Behavior::Slow(delay) => tokio::time::sleep(delay).await,
            Behavior::Echo => {}
        }

        match self.format {
            OutputFormat::Docx => {
                let mut bytes = b"PK\x03\x04".to_vec();
                bytes.extend_from_slice(document.markdown.as_bytes());
                Ok(EngineOutput::Document(bytes))
            }
            OutputFormat::Pdf => {
                let mut bytes = b"%PDF-1.7\n".to_vec();
                bytes.extend_from_slice(document.html.as_bytes());
                Ok(EngineOutput::Document(bytes))
            }
            OutputFormat::Gdocs => {
                let credential = credential.ok_or(EngineError::AuthRequired)?;
                if credential.token() == REJECTED_TOKEN {
                    return Err(EngineError::AuthRequired);
                }
                Ok(EngineOutput::Link {
                    web_view_link: "https://docs.google.com/document/d/fake-id/edit".to_string(),
                })
            }
        }
    }

    async fn version(&self) -> Result<String, EngineError> {
        match self.behavior {
            Behavior::Fail => Err(EngineError::Unavailable("not installed".to_string())),
            _ => Ok(format!("{} 1.0", self.name())),
        }
    }
}

pub fn test_config(storage_root: &std::path::Path) -> ConverterConfig {
    ConverterConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            log_format: "text".to_string(),
        },
        storage_root: storage_root.to_path_buf(),
        public_base_url: String::new(),
        max_file_size_bytes: 10 * 1024 * 1024,
        allowed_extensions: ["md", "markdown", "txt", "html", "htm"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        allowed_content_types: ["text/plain", "text/markdown", "text/html"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        retention_hours: 24,
        sweep_interval_secs: 3600,
        tombstone_retention_hours: 168,
        request_timeout_secs: 30,
        engine_timeout_secs: 20,
        conversion_workers: 2,
        pandoc_path: "pandoc".to_string(),
        weasyprint_path: "weasyprint".to_string(),
        docx_template_path: None,
        include_front_matter: true,
        google_docs_api_base: "http://127.0.0.1:9".to_string(),
        cloud_auth_url: AUTH_URL.to_string(),
        cloud_auth_allowed_hosts: vec!["accounts.google.com".to_string()],
        metadata_limits: MetadataLimits::default(),
    }
}

/// Test application: server plus the concrete store for backdating jobs.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub store: Arc<LocalJobStore>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of job directories currently on disk.
    pub fn job_count(&self) -> usize {
        std::fs::read_dir(self.store.root())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .count()
    }
}

pub fn default_engines() -> Vec<Arc<dyn ConversionEngine>> {
    OutputFormat::ALL
        .into_iter()
        .map(|format| Arc::new(FakeEngine::new(format)) as Arc<dyn ConversionEngine>)
        .collect()
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(default_engines(), |_| {}).await
}

pub async fn setup_test_app_with(
    engines: Vec<Arc<dyn ConversionEngine>>,
    configure: impl FnOnce(&mut ConverterConfig),
) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut converter_config = test_config(temp_dir.path());
    configure(&mut converter_config);
    let config = Config(Box::new(converter_config));

    let store = Arc::new(
        LocalJobStore::new(
            config.storage_root().clone(),
            config.retention(),
            config.tombstone_retention(),
        )
        .await
        .expect("Failed to create job store"),
    );

    let orchestrator = engines.into_iter().fold(
        ConversionOrchestrator::new(config.conversion_workers(), config.engine_timeout()),
        |orchestrator, engine| orchestrator.with_engine(engine),
    );

    let state = services::build_state(&config, store.clone() as Arc<dyn JobStore>, orchestrator);
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        store,
        _temp_dir: temp_dir,
    }
}

/// Multipart form with a markdown file and the given `formats` value.
pub fn markdown_form(filename: &str, content: impl Into<Vec<u8>>, formats: Option<&str>) -> MultipartForm {
    let part = Part::bytes(content.into())
        .file_name(filename.to_string())
        .mime_type("text/markdown");
    let form = MultipartForm::new().add_part("file", part);
    match formats {
        Some(formats) => form.add_text("formats", formats.to_string()),
        None => form,
    }
}
