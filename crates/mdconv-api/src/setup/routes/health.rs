//! Health check handler and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use mdconv_core::constants::{SERVICE_NAME, SERVICE_VERSION};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DependencyStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Conversion engines keyed by name
    pub dependencies: BTreeMap<String, DependencyStatus>,
    pub storage: String,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "A dependency is unavailable", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut healthy = true;
    let mut dependencies = BTreeMap::new();

    match tokio::time::timeout(CHECK_TIMEOUT, state.orchestrator.health()).await {
        Ok(engines) => {
            for engine in engines {
                let status = match engine.version {
                    Ok(version) => DependencyStatus {
                        status: "healthy".to_string(),
                        version: Some(version),
                    },
                    Err(e) => {
                        tracing::error!(engine = engine.engine, error = %e, "Engine health check failed");
                        healthy = false;
                        DependencyStatus {
                            status: format!("unavailable: {}", e),
                            version: None,
                        }
                    }
                };
                dependencies.insert(engine.engine.to_string(), status);
            }
        }
        Err(_) => {
            tracing::error!("Engine health checks timed out");
            healthy = false;
        }
    }

    let store = state.store.clone();
    let storage = run_check(
        CHECK_TIMEOUT,
        async move { store.health_check().await },
        "unhealthy",
    )
    .await;
    healthy &= storage == "healthy";

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
        dependencies,
        storage,
        timestamp: Utc::now().to_rfc3339(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_check_statuses() {
        let ok = run_check(Duration::from_secs(1), async { Ok::<(), String>(()) }, "unhealthy").await;
        assert_eq!(ok, "healthy");

        let err = run_check(
            Duration::from_secs(1),
            async { Err::<(), _>("disk full".to_string()) },
            "unhealthy",
        )
        .await;
        assert_eq!(err, "unhealthy: disk full");

        let slow = run_check(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<(), String>(())
            },
            "unhealthy",
        )
        .await;
        assert_eq!(slow, "timeout");
    }
}
