//! Campaign delivery worker.
//!
//! Wires the durable job queue, the record store, and the email
//! transport into a single worker process. The HTTP enqueue/status
//! entrypoints live in the excluded API layer; [`JobQueue::enqueue`]
//! and [`JobQueue::status`] are the seam it calls.

mod config;

use std::sync::Arc;

use outreach_core::{Signal, internal, logging, store::MemoryStore, transport::LogTransport};
use outreach_delivery::Worker;
use outreach_queue::JobQueue;
use tokio::sync::broadcast;

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = config::Config::load()?;

    let store = config.store.into_store()?;
    let queue = Arc::new(JobQueue::new(store, config.queue));
    let report = queue.restore().await?;
    internal!(
        level = INFO,
        "Queue restored: {} pending, {} re-queued",
        report.queued,
        report.requeued
    );

    // In-memory records and a logging transport until the relational
    // backend and provider are wired in
    let records = Arc::new(MemoryStore::new());
    let transport = Arc::new(LogTransport);

    let worker = Worker::new(config.worker, Arc::clone(&queue), records, transport);

    let (shutdown, receiver) = broadcast::channel(16);
    let handle = tokio::spawn(async move { worker.serve(receiver).await });

    wait_for_signal().await?;

    shutdown
        .send(Signal::Shutdown)
        .map_err(|e| anyhow::anyhow!("Failed to broadcast shutdown: {e}"))?;

    // Let an in-flight job finish its tick before exiting
    handle.await??;

    internal!(level = INFO, "Shutdown complete");

    Ok(())
}

async fn wait_for_signal() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!("Terminate signal received, shutting down");
        }
    }

    Ok(())
}
