//! Multipart form extraction for the convert endpoint

use crate::error::HttpAppError;
use axum::extract::Multipart;
use mdconv_core::AppError;

/// Fields of a convert request, before validation.
#[derive(Debug, Default)]
pub struct ConvertForm {
    pub filename: Option<String>,
    /// Bytes of the `file` field, capped at the size limit.
    pub data: Option<Vec<u8>>,
    /// Total bytes received for the `file` field, including any not kept.
    pub received_size: usize,
    /// Raw `formats` values; each may itself be a comma separated list.
    pub formats: Vec<String>,
}

/// Read the convert form. Only one field named "file" is accepted; the
/// requested formats come from any number of `formats` (or `format`) fields.
///
/// File bytes beyond `max_size` are counted but not buffered, so an oversized
/// upload is reported with its real size without holding it in memory.
pub async fn extract_convert_form(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<ConvertForm, HttpAppError> {
    let mut form = ConvertForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if form.data.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    )
                    .into());
                }
                form.filename = field.file_name().map(|s| s.to_string());

                let mut data = Vec::new();
                let mut received = 0usize;
                while let Some(chunk) = field.chunk().await? {
                    received = received.saturating_add(chunk.len());
                    if received <= max_size {
                        data.extend_from_slice(&chunk);
                    }
                }

                form.received_size = received;
                form.data = Some(data);
            }
            "formats" | "format" => {
                form.formats.push(field.text().await?);
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}
