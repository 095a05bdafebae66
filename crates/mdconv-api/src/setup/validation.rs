//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use mdconv_core::Config;

/// Fail fast on configuration that is unsafe or cannot work.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() {
        if config.cors_origins().iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS configured to allow all origins (*) in production. \
                Set specific allowed origins via CORS_ORIGINS."
            ));
        }

        if config.public_base_url().is_empty() {
            tracing::warn!("PUBLIC_BASE_URL not set - download URLs will be relative");
        }
    }

    if let Some(template) = config.docx_template_path() {
        if !template.is_file() {
            tracing::warn!(
                path = %template.display(),
                "DOCX_TEMPLATE_PATH does not exist - pandoc defaults will be used"
            );
        }
    }

    if config.engine_timeout() > config.request_timeout() {
        tracing::warn!(
            engine_timeout_secs = config.engine_timeout().as_secs(),
            request_timeout_secs = config.request_timeout().as_secs(),
            "ENGINE_TIMEOUT_SECS exceeds REQUEST_TIMEOUT_SECS - slow engines will hit the request timeout first"
        );
    }

    Ok(())
}
