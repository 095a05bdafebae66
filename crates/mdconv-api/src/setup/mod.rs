//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use mdconv_core::constants::{SERVICE_NAME, SERVICE_VERSION};
use mdconv_core::Config;
use mdconv_infra::LogFormat;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(
    config: Config,
) -> Result<(Arc<AppState>, axum::Router, services::BackgroundTasks)> {
    // Fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    mdconv_infra::init_telemetry(
        LogFormat::parse(config.log_format()),
        SERVICE_NAME,
        SERVICE_VERSION,
        config.environment(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let (state, tasks) = services::initialize_services(&config).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router, tasks))
}
