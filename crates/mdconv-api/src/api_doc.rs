//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes::health;
use mdconv_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Markdown Converter API",
        version = "0.1.0",
        description = "Converts uploaded markdown documents to DOCX, PDF and Google Docs. Converted files are kept for a limited retention window and downloaded by job id."
    ),
    paths(
        handlers::convert::convert_document,
        handlers::download::download_artifact,
        handlers::metrics::get_metrics,
        health::health_check,
    ),
    components(
        schemas(
            error::ErrorResponse,
            handlers::convert::ConvertResponse,
            handlers::convert::FormatResult,
            health::HealthCheckResponse,
            health::DependencyStatus,
            models::OutputFormat,
            models::ArtifactDescriptor,
            mdconv_infra::MetricsSnapshot,
            mdconv_infra::metrics::FormatSnapshot,
        )
    ),
    tags(
        (name = "conversion", description = "Document conversion and download"),
        (name = "health", description = "Service health"),
        (name = "metrics", description = "Conversion counters")
    )
)]
pub struct ApiDoc;
