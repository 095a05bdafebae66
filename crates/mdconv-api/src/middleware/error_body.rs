use crate::error::{ErrorDetail, ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use mdconv_core::{AppError, ValidationKind};
use std::sync::Arc;

/// Finishes error responses.
///
/// A bare 413 from the transport body limit becomes a `FILE_TOO_LARGE` error
/// body. Outside production the detailed body attached by [`HttpAppError`]
/// replaces the public one.
pub async fn error_body_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE
        && response.extensions().get::<ErrorDetail>().is_none()
    {
        state.metrics.record_validation_rejection();
        response = HttpAppError(AppError::validation(
            ValidationKind::FileTooLarge,
            "Upload exceeds the size limit",
        ))
        .into_response();
    }

    match response.extensions_mut().remove::<ErrorDetail>() {
        Some(ErrorDetail(detailed)) if !state.config.is_production() => {
            with_body(response, detailed)
        }
        _ => response,
    }
}

fn with_body(response: Response, body: ErrorResponse) -> Response {
    let (mut parts, _) = response.into_parts();
    let (body_parts, body) = Json(body).into_response().into_parts();
    parts.headers.extend(body_parts.headers);
    Response::from_parts(parts, body)
}
