//! Conversion orchestration
//!
//! Dispatches an assembled document to the engine of every requested format.
//! Formats run concurrently and fail independently; local engines share a
//! bounded worker pool.

use crate::assembler::AssembledDocument;
use crate::engines::{CloudCredential, ConversionEngine, EngineError, EngineOutput};
use futures::future::join_all;
use mdconv_core::OutputFormat;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

pub type EngineResult = Result<EngineOutput, EngineError>;

/// Version report for one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineHealth {
    pub format: OutputFormat,
    pub engine: &'static str,
    pub version: Result<String, String>,
}

pub struct ConversionOrchestrator {
    engines: HashMap<OutputFormat, Arc<dyn ConversionEngine>>,
    workers: Arc<Semaphore>,
    engine_timeout: Duration,
}

impl ConversionOrchestrator {
    pub fn new(workers: usize, engine_timeout: Duration) -> Self {
        Self {
            engines: HashMap::new(),
            workers: Arc::new(Semaphore::new(workers.max(1))),
            engine_timeout,
        }
    }

    /// Register an engine for its format, replacing any previous one.
    pub fn with_engine(mut self, engine: Arc<dyn ConversionEngine>) -> Self {
        self.engines.insert(engine.format(), engine);
        self
    }

    pub fn supports(&self, format: OutputFormat) -> bool {
        self.engines.contains_key(&format)
    }

    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// Convert `document` into every format in `formats`. The result holds one
    /// entry per format, in request order.
    #[tracing::instrument(skip_all, fields(formats = ?formats))]
    pub async fn convert(
        &self,
        document: &AssembledDocument,
        formats: &[OutputFormat],
        credential: Option<&CloudCredential>,
    ) -> Vec<(OutputFormat, EngineResult)> {
        let document = Arc::new(document.clone());

        let tasks = formats.iter().copied().map(|format| {
            let engine = self.engines.get(&format).cloned();
            let workers = self.workers.clone();
            let document = document.clone();
            let credential = credential.cloned();
            let timeout = self.engine_timeout;

            let handle = tokio::spawn(async move {
                let Some(engine) = engine else {
                    return Err(EngineError::Unavailable(format!(
                        "no engine registered for {}",
                        format.as_str()
                    )));
                };
                run_engine(engine, workers, &document, credential.as_ref(), timeout).await
            });

            async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(EngineError::Failed(format!("conversion task aborted: {}", e))),
                };
                (format, result)
            }
        });

        let results = join_all(tasks).await;

        for (format, result) in &results {
            match result {
                Ok(_) => {}
                Err(EngineError::AuthRequired) => {
                    tracing::info!(format = %format.as_str(), "Cloud authorization required");
                }
                Err(e) => {
                    tracing::error!(format = %format.as_str(), error = %e, "Conversion failed");
                }
            }
        }

        results
    }

    /// Version of every registered engine.
    pub async fn health(&self) -> Vec<EngineHealth> {
        let mut engines: Vec<_> = self.engines.values().cloned().collect();
        engines.sort_by_key(|e| e.format());

        let probes = engines.into_iter().map(|engine| async move {
            EngineHealth {
                format: engine.format(),
                engine: engine.name(),
                version: engine.version().await.map_err(|e| e.to_string()),
            }
        });

        join_all(probes).await
    }
}

async fn run_engine(
    engine: Arc<dyn ConversionEngine>,
    workers: Arc<Semaphore>,
    document: &AssembledDocument,
    credential: Option<&CloudCredential>,
    timeout: Duration,
) -> EngineResult {
    let _permit = if engine.is_local() {
        Some(
            workers
                .acquire_owned()
                .await
                .map_err(|_| EngineError::Unavailable("worker pool closed".to_string()))?,
        )
    } else {
        None
    };

    let start = Instant::now();
    let result = tokio::time::timeout(timeout, engine.convert(document, credential))
        .await
        .unwrap_or(Err(EngineError::Timeout(timeout)));

    tracing::debug!(
        engine = engine.name(),
        duration_ms = start.elapsed().as_millis() as u64,
        success = result.is_ok(),
        "Engine finished"
    );

    result
}
