//! Scheduled removal of expired jobs
//!
//! Runs on its own task, never on the request path. The first pass happens
//! at startup so jobs that expired while the service was down are removed
//! promptly.

use chrono::Utc;
use mdconv_storage::{JobStore, StorageResult, SweepReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Clone)]
pub struct SweepService {
    store: Arc<dyn JobStore>,
    interval: Duration,
}

impl SweepService {
    pub fn new(store: Arc<dyn JobStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Start the background sweep loop.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.interval);
            sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled sweep of expired jobs");

                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Sweep failed");
                }
            }
        })
    }

    /// One sweep pass as of now.
    #[tracing::instrument(skip(self), fields(sweep.operation = "expire_jobs"))]
    pub async fn run_once(&self) -> StorageResult<SweepReport> {
        let report = self.store.sweep(Utc::now()).await?;

        tracing::info!(
            scanned = report.scanned,
            deleted = report.deleted,
            kept = report.kept,
            skipped = report.skipped,
            failed = report.failed,
            tombstones_purged = report.tombstones_purged,
            "Sweep completed"
        );

        Ok(report)
    }
}
