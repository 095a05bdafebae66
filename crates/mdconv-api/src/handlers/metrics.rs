use crate::state::AppState;
use axum::{extract::State, Json};
use mdconv_infra::MetricsSnapshot;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "metrics",
    responses(
        (status = 200, description = "Conversion counters since startup", body = MetricsSnapshot)
    )
)]
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
