//! Configuration module
//!
//! Everything is read from environment variables (a `.env` file is honoured via
//! `dotenvy`). Unparseable values fall back to their defaults; `validate`
//! rejects combinations that would be unsafe to run with.

use std::env;
use std::path::PathBuf;

use crate::sanitize::is_safe_redirect_url;

const SERVER_PORT: u16 = 8080;
const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
const RETENTION_HOURS: i64 = 24;
const SWEEP_INTERVAL_SECS: u64 = 3600;
const TOMBSTONE_RETENTION_HOURS: i64 = 168;
/// Upper bound for retention windows (one year)
const MAX_RETENTION_HOURS: i64 = 24 * 365;
const REQUEST_TIMEOUT_SECS: u64 = 45;
const ENGINE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ALLOWED_EXTENSIONS: &str = "md,markdown,txt,html,htm";
const DEFAULT_ALLOWED_CONTENT_TYPES: &str = "text/plain,text/markdown,text/html";

/// Limits applied when sanitizing front matter metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataLimits {
    pub max_key_len: usize,
    pub max_value_len: usize,
    pub max_list_items: usize,
    pub max_list_item_len: usize,
}

impl Default for MetadataLimits {
    fn default() -> Self {
        Self {
            max_key_len: 50,
            max_value_len: 500,
            max_list_items: 10,
            max_list_item_len: 100,
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: String,
}

/// Conversion service configuration
#[derive(Clone, Debug)]
pub struct ConverterConfig {
    pub base: BaseConfig,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub retention_hours: i64,
    pub sweep_interval_secs: u64,
    pub tombstone_retention_hours: i64,
    pub request_timeout_secs: u64,
    pub engine_timeout_secs: u64,
    pub conversion_workers: usize,
    pub pandoc_path: String,
    pub weasyprint_path: String,
    pub docx_template_path: Option<PathBuf>,
    pub include_front_matter: bool,
    pub google_docs_api_base: String,
    pub cloud_auth_url: String,
    pub cloud_auth_allowed_hosts: Vec<String>,
    pub metadata_limits: MetadataLimits,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ConverterConfig>);

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

impl ConverterConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env_or("PORT", SERVER_PORT),
            cors_origins,
            environment,
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
        };

        let defaults = MetadataLimits::default();
        let metadata_limits = MetadataLimits {
            max_key_len: env_or("METADATA_MAX_KEY_LEN", defaults.max_key_len),
            max_value_len: env_or("METADATA_MAX_VALUE_LEN", defaults.max_value_len),
            max_list_items: env_or("METADATA_MAX_LIST_ITEMS", defaults.max_list_items),
            max_list_item_len: env_or("METADATA_MAX_LIST_ITEM_LEN", defaults.max_list_item_len),
        };

        let docx_template_path = env::var("DOCX_TEMPLATE_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(ConverterConfig {
            base,
            storage_root: PathBuf::from(
                env::var("STORAGE_ROOT").unwrap_or_else(|_| "./tmp/converted".to_string()),
            ),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            max_file_size_bytes: env_or("MAX_FILE_SIZE", MAX_FILE_SIZE_BYTES),
            allowed_extensions: env_list("ALLOWED_EXTENSIONS", DEFAULT_ALLOWED_EXTENSIONS),
            allowed_content_types: env_list(
                "ALLOWED_CONTENT_TYPES",
                DEFAULT_ALLOWED_CONTENT_TYPES,
            ),
            retention_hours: env_or("RETENTION_HOURS", RETENTION_HOURS),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", SWEEP_INTERVAL_SECS),
            tombstone_retention_hours: env_or(
                "TOMBSTONE_RETENTION_HOURS",
                TOMBSTONE_RETENTION_HOURS,
            ),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS),
            engine_timeout_secs: env_or("ENGINE_TIMEOUT_SECS", ENGINE_TIMEOUT_SECS),
            conversion_workers: env_or("CONVERSION_WORKERS", default_workers()).max(1),
            pandoc_path: env::var("PANDOC_PATH").unwrap_or_else(|_| "pandoc".to_string()),
            weasyprint_path: env::var("WEASYPRINT_PATH")
                .unwrap_or_else(|_| "weasyprint".to_string()),
            docx_template_path,
            include_front_matter: env_bool("INCLUDE_FRONT_MATTER", true),
            google_docs_api_base: env::var("GOOGLE_DOCS_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            cloud_auth_url: env::var("CLOUD_AUTH_URL")
                .unwrap_or_else(|_| "/auth/google/login".to_string()),
            cloud_auth_allowed_hosts: env_list("CLOUD_AUTH_ALLOWED_HOSTS", "accounts.google.com"),
            metadata_limits,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE must be greater than 0"));
        }

        if !(1..=MAX_RETENTION_HOURS).contains(&self.retention_hours) {
            anyhow::bail!("RETENTION_HOURS must be between 1 and {}", MAX_RETENTION_HOURS);
        }

        if !(1..=MAX_RETENTION_HOURS).contains(&self.tombstone_retention_hours) {
            anyhow::bail!(
                "TOMBSTONE_RETENTION_HOURS must be between 1 and {}",
                MAX_RETENTION_HOURS
            );
        }

        if self.sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!("SWEEP_INTERVAL_SECS must be greater than 0"));
        }

        if self.request_timeout_secs == 0 || self.engine_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "REQUEST_TIMEOUT_SECS and ENGINE_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS cannot be empty"));
        }

        if !is_safe_redirect_url(&self.cloud_auth_url, &self.cloud_auth_allowed_hosts) {
            return Err(anyhow::anyhow!(
                "CLOUD_AUTH_URL must be a relative path or an https URL on CLOUD_AUTH_ALLOWED_HOSTS"
            ));
        }

        Ok(())
    }
}

impl Config {
    fn inner(&self) -> &ConverterConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ConverterConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn storage_root(&self) -> &PathBuf {
        &self.inner().storage_root
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.inner().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.inner().allowed_content_types
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.inner().retention_hours.clamp(1, MAX_RETENTION_HOURS))
    }

    pub fn tombstone_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(
            self.inner()
                .tombstone_retention_hours
                .clamp(1, MAX_RETENTION_HOURS),
        )
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.inner().sweep_interval_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.inner().request_timeout_secs)
    }

    pub fn engine_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.inner().engine_timeout_secs)
    }

    pub fn conversion_workers(&self) -> usize {
        self.inner().conversion_workers
    }

    pub fn pandoc_path(&self) -> &str {
        &self.inner().pandoc_path
    }

    pub fn weasyprint_path(&self) -> &str {
        &self.inner().weasyprint_path
    }

    pub fn docx_template_path(&self) -> Option<&PathBuf> {
        self.inner().docx_template_path.as_ref()
    }

    pub fn include_front_matter(&self) -> bool {
        self.inner().include_front_matter
    }

    pub fn google_docs_api_base(&self) -> &str {
        &self.inner().google_docs_api_base
    }

    pub fn cloud_auth_url(&self) -> &str {
        &self.inner().cloud_auth_url
    }

    pub fn metadata_limits(&self) -> &MetadataLimits {
        &self.inner().metadata_limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConverterConfig {
        ConverterConfig {
            base: BaseConfig {
                server_port: 8080,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                log_format: "text".to_string(),
            },
            storage_root: PathBuf::from("/tmp/mdconv"),
            public_base_url: String::new(),
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            allowed_extensions: vec!["md".to_string()],
            allowed_content_types: vec!["text/markdown".to_string()],
            retention_hours: 24,
            sweep_interval_secs: 3600,
            tombstone_retention_hours: 168,
            request_timeout_secs: 45,
            engine_timeout_secs: 30,
            conversion_workers: 2,
            pandoc_path: "pandoc".to_string(),
            weasyprint_path: "weasyprint".to_string(),
            docx_template_path: None,
            include_front_matter: true,
            google_docs_api_base: "https://www.googleapis.com".to_string(),
            cloud_auth_url: "/auth/google/login".to_string(),
            cloud_auth_allowed_hosts: vec!["accounts.google.com".to_string()],
            metadata_limits: MetadataLimits::default(),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let mut config = sample();
        config.retention_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_retention() {
        let mut config = sample();
        config.retention_hours = -5;
        assert!(config.validate().is_err());

        config.retention_hours = i64::MAX;
        assert!(config.validate().is_err());

        config.retention_hours = MAX_RETENTION_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_tombstone_retention() {
        let mut config = sample();
        config.tombstone_retention_hours = 0;
        assert!(config.validate().is_err());

        config.tombstone_retention_hours = -1;
        assert!(config.validate().is_err());

        config.tombstone_retention_hours = MAX_RETENTION_HOURS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_getter_never_overflows() {
        let mut inner = sample();
        inner.retention_hours = i64::MAX;
        inner.tombstone_retention_hours = i64::MIN;
        let config = Config(Box::new(inner));
        assert_eq!(config.retention().num_hours(), MAX_RETENTION_HOURS);
        assert_eq!(config.tombstone_retention().num_hours(), 1);
    }

    #[test]
    fn test_validate_rejects_foreign_auth_redirect() {
        let mut config = sample();
        config.cloud_auth_url = "https://evil.example.com/login".to_string();
        assert!(config.validate().is_err());

        config.cloud_auth_url = "https://accounts.google.com/o/oauth2/auth".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let mut inner = sample();
        inner.base.environment = "Production".to_string();
        assert!(Config(Box::new(inner)).is_production());
        assert!(!Config(Box::new(sample())).is_production());
    }
}
