//! The worker loop: claim one job per tick and drive it through the
//! pipeline.

mod process;

use std::{sync::Arc, time::Duration};

use outreach_core::{Signal, internal, store::RecordStore, transport::EmailTransport};
use outreach_queue::JobQueue;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::DeliveryError;

const fn default_poll_interval() -> u64 {
    5
}

const fn default_claim_timeout() -> u64 {
    500
}

/// Worker loop tuning.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WorkerConfig {
    /// How often to poll the queue for a job (in seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// How long one claim attempt may block on an empty queue
    /// (in milliseconds). Kept well under the poll interval so a tick
    /// never overlaps the next.
    #[serde(default = "default_claim_timeout")]
    pub claim_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            claim_timeout_ms: default_claim_timeout(),
        }
    }
}

/// Polls the queue on a fixed interval and processes claimed jobs.
///
/// Strictly one job per tick. Higher throughput comes from a shorter
/// interval or additional worker instances; the queue's atomic claim
/// keeps multiple workers from double-processing a job.
#[derive(Debug)]
pub struct Worker {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn EmailTransport>,
}

impl Worker {
    #[must_use]
    pub fn new(
        config: WorkerConfig,
        queue: Arc<JobQueue>,
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        Self {
            config,
            queue,
            store,
            transport,
        }
    }

    /// Claim and process at most one job. Returns whether a job was
    /// claimed.
    ///
    /// Job-level failures are reconciled into the queue's failed list
    /// here and do not surface as errors; only queue-level faults do.
    ///
    /// # Errors
    /// If the queue itself fails (claim, release, or lock poisoning).
    pub async fn run_once(&self) -> Result<bool, DeliveryError> {
        let timeout = Duration::from_millis(self.config.claim_timeout_ms);
        let Some(job) = self.queue.claim_next(timeout).await? else {
            return Ok(false);
        };

        process::process_job(self, job).await?;
        Ok(true)
    }

    /// Run the worker until a shutdown signal arrives.
    ///
    /// A job in-flight when the signal lands finishes its current tick
    /// before the loop exits; the `select!` only preempts between
    /// ticks.
    ///
    /// # Errors
    /// If the queue fails in a way a tick cannot absorb.
    pub async fn serve(
        &self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), DeliveryError> {
        internal!(level = INFO, "Campaign worker starting");

        let mut timer = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        // Skip the first tick to avoid immediate execution
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match self.run_once().await {
                        Ok(true) => debug!("Processed one job"),
                        Ok(false) => debug!("No job available this tick"),
                        Err(e) => error!("Worker tick failed: {e}"),
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            internal!(level = INFO, "Campaign worker received shutdown signal");
                            break;
                        }
                        Err(e) => {
                            error!("Campaign worker shutdown channel error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
