//! Application state shared by every handler.

use mdconv_core::Config;
use mdconv_infra::ConversionMetrics;
use mdconv_processing::{ConversionOrchestrator, DocumentAssembler, UploadValidator};
use mdconv_storage::JobStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn JobStore>,
    pub orchestrator: Arc<ConversionOrchestrator>,
    pub validator: Arc<UploadValidator>,
    pub assembler: DocumentAssembler,
    pub metrics: Arc<ConversionMetrics>,
}
