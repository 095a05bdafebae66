//! Conversion counters
//!
//! Lock-free counters updated on the request path and exposed as a JSON
//! snapshot.

use mdconv_core::OutputFormat;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use utoipa::ToSchema;

#[derive(Debug, Default)]
struct FormatCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Default)]
pub struct ConversionMetrics {
    requests: AtomicU64,
    jobs_created: AtomicU64,
    validation_rejections: AtomicU64,
    auth_required: AtomicU64,
    timeouts: AtomicU64,
    downloads: AtomicU64,
    docx: FormatCounters,
    pdf: FormatCounters,
    gdocs: FormatCounters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FormatSnapshot {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub jobs_created: u64,
    pub validation_rejections: u64,
    pub auth_required: u64,
    pub timeouts: u64,
    pub downloads: u64,
    pub formats: BTreeMap<String, FormatSnapshot>,
}

impl ConversionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn format(&self, format: OutputFormat) -> &FormatCounters {
        match format {
            OutputFormat::Docx => &self.docx,
            OutputFormat::Pdf => &self.pdf,
            OutputFormat::Gdocs => &self.gdocs,
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_created(&self) {
        self.jobs_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_required(&self) {
        self.auth_required.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download(&self) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conversion(&self, format: OutputFormat, success: bool) {
        let counters = self.format(format);
        if success {
            counters.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let formats = OutputFormat::ALL
            .iter()
            .map(|format| {
                let counters = self.format(*format);
                (
                    format.as_str().to_string(),
                    FormatSnapshot {
                        succeeded: counters.succeeded.load(Ordering::Relaxed),
                        failed: counters.failed.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            jobs_created: self.jobs_created.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            auth_required: self.auth_required.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            formats,
        }
    }
}
