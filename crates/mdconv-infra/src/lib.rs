//! Shared infrastructure for the markdown conversion service:
//! - Middleware (request ID, security headers)
//! - Telemetry initialization
//! - Scheduled sweep of expired jobs
//! - Conversion counters

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "sweep")]
pub mod sweep;

#[cfg(feature = "metrics")]
pub mod metrics;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{
    get_request_id, request_id_middleware, security_headers_middleware, RequestId,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

#[cfg(feature = "sweep")]
pub use sweep::SweepService;

#[cfg(feature = "metrics")]
pub use metrics::{ConversionMetrics, MetricsSnapshot};
