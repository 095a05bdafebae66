use crate::constants::CLOUD_TOKEN_HEADER;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_convert_form;
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use mdconv_core::{
    sanitize::download_stem, AppError, ConversionOutcome, DocumentMetadata, JobId, OutputFormat,
    ValidationKind,
};
use mdconv_processing::{
    extract, sanitize_metadata, CloudCredential, EngineError, EngineOutput, EngineResult,
    SourceKind, UploadCandidate,
};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Per-format entry of a convert response.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum FormatResult {
    Download {
        download_url: String,
        filename: String,
        size: u64,
        mimetype: String,
    },
    Link {
        web_view_link: String,
    },
    AuthRequired {
        #[serde(rename = "authRequired")]
        auth_required: bool,
        #[serde(rename = "authUrl")]
        auth_url: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConvertResponse {
    /// `success` when at least one format converted, `failed` otherwise
    pub status: String,
    pub job_id: String,
    /// Sanitized front matter metadata
    #[schema(value_type = Object)]
    pub metadata: DocumentMetadata,
    /// Results keyed by format, in request order
    #[schema(value_type = Object)]
    pub formats: Map<String, Value>,
    pub timestamp: String,
}

fn download_url(base: &str, job_id: JobId, format: OutputFormat) -> String {
    format!("{}/api/download/{}/{}", base, job_id, format.as_str())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn cloud_credential(headers: &HeaderMap) -> Option<CloudCredential> {
    headers
        .get(CLOUD_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(CloudCredential::new)
}

/// Turn one engine result into a recorded outcome, storing artifact bytes.
async fn settle(
    state: &AppState,
    job_id: JobId,
    format: OutputFormat,
    result: EngineResult,
) -> ConversionOutcome {
    let id = job_id.to_string();

    let outcome = match result {
        Ok(EngineOutput::Document(bytes)) => {
            return match state.store.store(&id, format, bytes).await {
                Ok(artifact) => ConversionOutcome::Stored(artifact),
                Err(e) => {
                    tracing::error!(job_id = %id, format = %format, error = %e, "Failed to store artifact");
                    let outcome = ConversionOutcome::Failed {
                        reason: "artifact could not be stored".to_string(),
                    };
                    record(state, &id, format, &outcome).await;
                    outcome
                }
            };
        }
        Ok(EngineOutput::Link { web_view_link }) => ConversionOutcome::Linked { web_view_link },
        Err(EngineError::AuthRequired) => ConversionOutcome::AuthRequired {
            auth_url: state.config.cloud_auth_url().to_string(),
        },
        Err(e) => ConversionOutcome::Failed {
            reason: e.to_string(),
        },
    };

    record(state, &id, format, &outcome).await;
    outcome
}

async fn record(state: &AppState, job_id: &str, format: OutputFormat, outcome: &ConversionOutcome) {
    if let Err(e) = state.store.record(job_id, format, outcome.status()).await {
        tracing::warn!(job_id = %job_id, format = %format, error = %e, "Failed to record format outcome");
    }
}

fn format_result(base_url: &str, job_id: JobId, format: OutputFormat, outcome: ConversionOutcome) -> FormatResult {
    match outcome {
        ConversionOutcome::Stored(artifact) => FormatResult::Download {
            download_url: download_url(base_url, job_id, format),
            filename: artifact.filename,
            size: artifact.size,
            mimetype: artifact.content_type,
        },
        ConversionOutcome::Linked { web_view_link } => FormatResult::Link { web_view_link },
        ConversionOutcome::AuthRequired { auth_url } => FormatResult::AuthRequired {
            auth_required: true,
            auth_url,
        },
        // Engine diagnostics stay in the logs
        ConversionOutcome::Failed { .. } => FormatResult::Failed {
            error: format!("{} conversion failed", format.as_str()),
        },
    }
}

#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "conversion",
    params(
        ("X-Cloud-Access-Token" = Option<String>, Header, description = "Bearer token for Google Docs export")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document converted", body = ConvertResponse),
        (status = 400, description = "Invalid input or front matter", body = ErrorResponse),
        (status = 401, description = "Cloud authorization required", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported media type", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "convert"))]
pub async fn convert_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>, HttpAppError> {
    state.metrics.record_request();
    let start = Instant::now();

    let form = extract_convert_form(multipart, state.validator.max_file_size()).await?;

    let mut formats = OutputFormat::parse_list(form.formats.iter().map(String::as_str))
        .map_err(|e| {
            tracing::debug!(format = %e.0, "Rejected unknown output format");
            AppError::validation(ValidationKind::InvalidFormat, e.to_string())
        })?;
    if formats.is_empty() {
        formats.push(OutputFormat::Docx);
    }

    let upload = state
        .validator
        .validate(&UploadCandidate {
            filename: form.filename.as_deref(),
            declared_size: Some(form.received_size),
            data: form.data.as_deref(),
        })
        .inspect_err(|_| state.metrics.record_validation_rejection())?;

    let credential = cloud_credential(&headers);
    if formats.contains(&OutputFormat::Gdocs) && credential.is_none() {
        state.metrics.record_auth_required();
        return Err(AppError::AuthRequired {
            auth_url: state.config.cloud_auth_url().to_string(),
        }
        .into());
    }

    let content_sha256 = sha256_hex(upload.text.as_bytes());

    let (metadata, content) = extract(&upload.text)?;
    let metadata = sanitize_metadata(metadata, state.config.metadata_limits());

    let source = if upload.is_html() {
        SourceKind::Html
    } else {
        SourceKind::Markdown
    };
    let document = state.assembler.assemble_source(&metadata, &content, source);
    let stem = download_stem(document.title.as_deref());

    let job = state
        .store
        .create(formats.clone(), content_sha256, stem)
        .await?;
    state.metrics.record_job_created();

    tracing::info!(
        job_id = %job.id,
        filename = %upload.filename,
        size_bytes = upload.size,
        formats = ?formats,
        "Converting document"
    );

    let conversion = async {
        let results = state
            .orchestrator
            .convert(&document, &formats, credential.as_ref())
            .await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (format, result) in results {
            outcomes.push((format, settle(&state, job.id, format, result).await));
        }
        outcomes
    };

    let outcomes = tokio::time::timeout(state.config.request_timeout(), conversion)
        .await
        .map_err(|_| {
            state.metrics.record_timeout();
            tracing::warn!(job_id = %job.id, "Conversion exceeded request timeout");
            AppError::Timeout(format!(
                "Conversion did not finish within {}s",
                state.config.request_timeout().as_secs()
            ))
        })?;

    let mut any_success = false;
    let mut results = Map::new();
    for (format, outcome) in outcomes {
        let success = outcome.is_success();
        any_success |= success;
        if matches!(outcome, ConversionOutcome::AuthRequired { .. }) {
            state.metrics.record_auth_required();
        } else {
            state.metrics.record_conversion(format, success);
        }

        let result = format_result(state.config.public_base_url(), job.id, format, outcome);
        let value = serde_json::to_value(&result).map_err(AppError::from)?;
        results.insert(format.as_str().to_string(), value);
    }

    tracing::info!(
        job_id = %job.id,
        success = any_success,
        duration_ms = start.elapsed().as_millis() as u64,
        "Conversion finished"
    );

    Ok(Json(ConvertResponse {
        status: if any_success { "success" } else { "failed" }.to_string(),
        job_id: job.id.to_string(),
        metadata,
        formats: results,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdconv_core::ArtifactDescriptor;

    #[test]
    fn test_download_url_is_relative_without_base() {
        let id = JobId::generate();
        assert_eq!(
            download_url("", id, OutputFormat::Pdf),
            format!("/api/download/{}/pdf", id)
        );
        assert_eq!(
            download_url("https://convert.example.com", id, OutputFormat::Docx),
            format!("https://convert.example.com/api/download/{}/docx", id)
        );
    }

    #[test]
    fn test_format_result_shapes() {
        let id = JobId::generate();
        let stored = ConversionOutcome::Stored(ArtifactDescriptor {
            format: OutputFormat::Docx,
            filename: "report.docx".to_string(),
            size: 42,
            content_type: "application/x-test".to_string(),
        });
        let json = serde_json::to_value(format_result("", id, OutputFormat::Docx, stored)).unwrap();
        assert_eq!(json["filename"], "report.docx");
        assert_eq!(json["size"], 42);
        assert_eq!(json["mimetype"], "application/x-test");
        assert!(json["download_url"].as_str().unwrap().ends_with("/docx"));

        let auth = ConversionOutcome::AuthRequired {
            auth_url: "/auth/google/login".to_string(),
        };
        let json = serde_json::to_value(format_result("", id, OutputFormat::Gdocs, auth)).unwrap();
        assert_eq!(json["authRequired"], true);
        assert_eq!(json["authUrl"], "/auth/google/login");
    }

    #[test]
    fn test_failure_hides_engine_detail() {
        let failed = ConversionOutcome::Failed {
            reason: "pandoc: /usr/share/data missing".to_string(),
        };
        let result = format_result("", JobId::generate(), OutputFormat::Pdf, failed);
        assert_eq!(
            result,
            FormatResult::Failed {
                error: "pdf conversion failed".to_string()
            }
        );
    }

    #[test]
    fn test_cloud_credential_from_header() {
        let mut headers = HeaderMap::new();
        assert!(cloud_credential(&headers).is_none());

        headers.insert(CLOUD_TOKEN_HEADER, "  ".parse().unwrap());
        assert!(cloud_credential(&headers).is_none());

        headers.insert(CLOUD_TOKEN_HEADER, "ya29.token".parse().unwrap());
        assert_eq!(cloud_credential(&headers).unwrap().token(), "ya29.token");
    }
}
