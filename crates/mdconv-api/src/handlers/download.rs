use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use futures::StreamExt;
use mdconv_core::{AppError, JobId, OutputFormat};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/download/{job_id}/{format}",
    tag = "conversion",
    params(
        ("job_id" = String, Path, description = "Job id returned by the convert endpoint"),
        ("format" = String, Path, description = "Artifact format: docx or pdf")
    ),
    responses(
        (status = 200, description = "Converted document", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed job id or format", body = ErrorResponse),
        (status = 404, description = "Job or artifact not found", body = ErrorResponse),
        (status = 410, description = "Job expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "download_artifact"))]
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path((job_id, format)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Reject forged ids before anything touches storage
    let job_id = JobId::parse(&job_id)?;
    let format: OutputFormat = format.parse().map_err(|e: mdconv_core::UnknownFormat| {
        tracing::debug!(format = %e.0, "Rejected unknown download format");
        AppError::InvalidInput(e.to_string())
    })?;

    let artifact = state.store.resolve(&job_id.to_string(), format).await?;

    tracing::debug!(
        job_id = %job_id,
        format = %format,
        size_bytes = artifact.size,
        "Streaming artifact"
    );

    let stream = state.store.download_stream(&artifact).await?;
    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let content_disposition = format!("attachment; filename=\"{}\"", artifact.download_name);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.content_type.as_str())
        .header(header::CONTENT_LENGTH, artifact.size)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    state.metrics.record_download();

    Ok(response)
}
