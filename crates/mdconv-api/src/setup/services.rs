//! Service initialization

use crate::state::AppState;
use anyhow::{Context, Result};
use mdconv_core::Config;
use mdconv_infra::{ConversionMetrics, SweepService};
use mdconv_processing::{
    ConversionOrchestrator, DocumentAssembler, GoogleDocsEngine, PandocEngine, UploadValidator,
    WeasyPrintEngine,
};
use mdconv_storage::{JobStore, LocalJobStore};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handles of tasks spawned next to the HTTP server.
pub struct BackgroundTasks {
    sweep: JoinHandle<()>,
}

impl BackgroundTasks {
    pub fn new(sweep: JoinHandle<()>) -> Self {
        Self { sweep }
    }

    /// Stop background tasks once the server has drained.
    pub async fn shutdown(self) {
        self.sweep.abort();
        match self.sweep.await {
            Err(e) if e.is_panic() => tracing::error!(error = %e, "Sweep task panicked"),
            _ => tracing::info!("Sweep task stopped"),
        }
    }
}

/// Build the job store, conversion engines and background sweep.
pub async fn initialize_services(config: &Config) -> Result<(Arc<AppState>, BackgroundTasks)> {
    let store = LocalJobStore::new(
        config.storage_root().clone(),
        config.retention(),
        config.tombstone_retention(),
    )
    .await
    .context("Failed to initialize job storage")?;
    let store: Arc<dyn JobStore> = Arc::new(store);

    tracing::info!(
        root = %config.storage_root().display(),
        retention_hours = config.retention().num_hours(),
        "Job storage initialized"
    );

    let engine_timeout = config.engine_timeout();
    let orchestrator = ConversionOrchestrator::new(config.conversion_workers(), engine_timeout)
        .with_engine(Arc::new(PandocEngine::new(
            config.pandoc_path(),
            config.docx_template_path().cloned(),
            engine_timeout,
        )))
        .with_engine(Arc::new(WeasyPrintEngine::new(
            config.weasyprint_path(),
            engine_timeout,
        )))
        .with_engine(Arc::new(GoogleDocsEngine::new(
            config.google_docs_api_base(),
            engine_timeout,
        )?));

    tracing::info!(
        workers = config.conversion_workers(),
        engine_timeout_secs = engine_timeout.as_secs(),
        "Conversion engines registered"
    );

    let sweep = Arc::new(SweepService::new(store.clone(), config.sweep_interval()));
    let tasks = BackgroundTasks::new(sweep.start());

    Ok((build_state(config, store, orchestrator), tasks))
}

/// Assemble the handler state around an already built store and orchestrator.
pub fn build_state(
    config: &Config,
    store: Arc<dyn JobStore>,
    orchestrator: ConversionOrchestrator,
) -> Arc<AppState> {
    let validator = UploadValidator::new(
        config.max_file_size_bytes(),
        config.allowed_extensions().to_vec(),
        config.allowed_content_types().to_vec(),
    );

    Arc::new(AppState {
        config: config.clone(),
        store,
        orchestrator: Arc::new(orchestrator),
        validator: Arc::new(validator),
        assembler: DocumentAssembler::new(config.include_front_matter()),
        metrics: Arc::new(ConversionMetrics::new()),
    })
}
