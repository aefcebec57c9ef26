//! The durable job queue: pending, in-flight, and failed lists with
//! atomic claim semantics.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use dashmap::DashMap;
use outreach_core::internal;
use tracing::warn;

use crate::{
    QueueError, Result,
    config::QueueConfig,
    job::{CompletionSummary, FailureRecord, Job, JobPayload, JobState, JobStatus},
    store::{JobRecord, JobStore, ListedRecord, MemoryJobStore, RecordedState},
    types::JobId,
};

#[derive(Debug, Default)]
struct Lists {
    pending: VecDeque<Job>,
    in_flight: HashMap<JobId, Job>,
}

/// Counts reported by [`JobQueue::restore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Jobs returned to the pending list in their original order.
    pub queued: usize,
    /// Stranded in-flight jobs re-queued at the head of pending.
    pub requeued: usize,
    /// Failed jobs restored to the failed list.
    pub failed: usize,
    /// Undecodable journal entries parked in the failed list.
    pub corrupt: usize,
}

/// Ordered, persistent work list for campaign send jobs.
///
/// Insertion order defines FIFO processing order. The pending and
/// in-flight lists share one mutex, so a claim moves a job between
/// them atomically: concurrent claimants can never both receive the
/// same job. Completed summaries and failure records live in
/// lock-free maps, bounded by the retention caps in [`QueueConfig`].
#[derive(Debug)]
pub struct JobQueue {
    lists: Mutex<Lists>,
    completed: DashMap<JobId, CompletionSummary>,
    failed: DashMap<JobId, FailureRecord>,
    notify: tokio::sync::Notify,
    store: Arc<dyn JobStore>,
    config: QueueConfig,
}

impl JobQueue {
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, config: QueueConfig) -> Self {
        Self {
            lists: Mutex::new(Lists::default()),
            completed: DashMap::new(),
            failed: DashMap::new(),
            notify: tokio::sync::Notify::new(),
            store,
            config,
        }
    }

    /// Queue backed by an in-memory journal, for tests and development.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryJobStore::new()), QueueConfig::default())
    }

    /// Append a job to the pending list and return its id.
    ///
    /// The job is journaled before it becomes claimable, so an enqueue
    /// that returns `Ok` survives a restart.
    ///
    /// # Errors
    /// If the journal write fails; the job is not queued in that case.
    pub async fn enqueue(&self, payload: JobPayload) -> Result<JobId> {
        let job = Job::new(payload);
        let id = job.id.clone();

        self.store.write(&JobRecord::queued(job.clone())).await?;

        self.lists.lock()?.pending.push_back(job);
        self.notify.notify_one();

        internal!(level = DEBUG, "Enqueued job {id}");

        Ok(id)
    }

    /// Atomically claim the head of the pending list.
    ///
    /// Blocks up to `timeout` when the pending list is empty; this is
    /// the only blocking operation on the queue. Returns `None` when no
    /// job became available within the timeout.
    ///
    /// # Errors
    /// If the internal lock is poisoned.
    pub async fn claim_next(&self, timeout: Duration) -> Result<Option<Job>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register interest before checking, so a notify between the
            // check and the await is not lost.
            let notified = self.notify.notified();

            if let Some(job) = self.try_claim()? {
                self.journal(JobRecord::in_flight(job.clone())).await;
                return Ok(Some(job));
            }

            let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now())
            else {
                return Ok(None);
            };

            if tokio::time::timeout(remaining, notified).await.is_err() {
                // Timed out; one final check in case a job arrived with
                // the permit already consumed.
                let claimed = self.try_claim()?;
                if let Some(job) = &claimed {
                    self.journal(JobRecord::in_flight(job.clone())).await;
                }
                return Ok(claimed);
            }
        }
    }

    fn try_claim(&self) -> Result<Option<Job>> {
        let mut lists = self.lists.lock()?;
        let Some(mut job) = lists.pending.pop_front() else {
            return Ok(None);
        };
        job.mark_claimed();
        lists.in_flight.insert(job.id.clone(), job.clone());
        Ok(Some(job))
    }

    /// Update the progress percentage of an in-flight job.
    ///
    /// Progress is monotonic: a lower value than the current one is
    /// ignored. Only the worker loop should call this.
    ///
    /// # Errors
    /// If the internal lock is poisoned.
    pub fn set_progress(&self, id: &JobId, progress: u8) -> Result<()> {
        let mut lists = self.lists.lock()?;
        if let Some(job) = lists.in_flight.get_mut(id) {
            job.progress = job.progress.max(progress.min(100));
        }
        Ok(())
    }

    /// Move an in-flight job to completed, retaining its summary for
    /// status queries. The journal entry is removed.
    ///
    /// # Errors
    /// `NotFound` if the job is not in-flight.
    pub async fn release_completed(&self, id: &JobId, summary: CompletionSummary) -> Result<()> {
        self.lists
            .lock()?
            .in_flight
            .remove(id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;

        self.completed.insert(id.clone(), summary);
        Self::evict_oldest(&self.completed, self.config.max_completed_retained);

        if let Err(e) = self.store.delete(id).await {
            warn!(job_id = %id, error = %e, "Failed to remove journal entry for completed job");
        }

        internal!(level = DEBUG, "Job {id} completed");

        Ok(())
    }

    /// Move an in-flight job to the failed list, stamped with the
    /// failure reason. The record remains inspectable until evicted by
    /// the retention cap.
    ///
    /// # Errors
    /// `NotFound` if the job is not in-flight.
    pub async fn release_failed(&self, id: &JobId, reason: impl Into<String>) -> Result<()> {
        let job = self
            .lists
            .lock()?
            .in_flight
            .remove(id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;

        let reason = reason.into();
        let record = FailureRecord::new(reason.clone(), Some(job.payload.clone()));
        self.failed.insert(id.clone(), record);

        self.journal(JobRecord::failed(job, reason)).await;
        self.evict_oldest_failed().await;

        internal!(level = DEBUG, "Job {id} failed");

        Ok(())
    }

    /// Answer a status query for a job id.
    ///
    /// # Errors
    /// If the internal lock is poisoned.
    pub fn status(&self, id: &JobId) -> Result<JobStatus> {
        {
            let lists = self.lists.lock()?;
            if let Some(job) = lists.in_flight.get(id) {
                return Ok(JobStatus {
                    state: JobState::Processing,
                    progress: job.progress,
                    detail: None,
                    summary: None,
                });
            }
            if lists.pending.iter().any(|job| &job.id == id) {
                return Ok(JobStatus {
                    state: JobState::Queued,
                    progress: 0,
                    detail: None,
                    summary: None,
                });
            }
        }

        if let Some(summary) = self.completed.get(id) {
            return Ok(JobStatus {
                state: JobState::Completed,
                progress: 100,
                detail: None,
                summary: Some(*summary.value()),
            });
        }

        if let Some(failure) = self.failed.get(id) {
            return Ok(JobStatus {
                state: JobState::Failed,
                progress: 0,
                detail: Some(failure.reason.clone()),
                summary: None,
            });
        }

        Ok(JobStatus::UNKNOWN)
    }

    /// Rebuild queue state from the journal after a restart.
    ///
    /// Queued records re-enter pending in their original order.
    /// Stranded in-flight records (the process died mid-job) are
    /// re-queued at the head so they are retried first. Failed records
    /// repopulate the failed list, and undecodable records are parked
    /// there with their raw bytes captured.
    ///
    /// # Errors
    /// If the journal cannot be listed.
    pub async fn restore(&self) -> Result<RestoreReport> {
        let records = self.store.list().await?;
        let mut report = RestoreReport::default();

        for listed in records {
            match listed {
                ListedRecord::Intact(record) => match record.state {
                    RecordedState::Queued => {
                        self.lists.lock()?.pending.push_back(record.job);
                        report.queued += 1;
                    }
                    RecordedState::InFlight => {
                        let id = record.job.id.clone();
                        warn!(job_id = %id, "Re-queueing job stranded in-flight by a previous run");
                        let mut job = record.job;
                        job.claimed_at = None;
                        job.progress = 0;
                        self.journal(JobRecord::queued(job.clone())).await;
                        self.lists.lock()?.pending.push_front(job);
                        report.requeued += 1;
                    }
                    RecordedState::Failed => {
                        let mut failure = FailureRecord::new(
                            record
                                .reason
                                .unwrap_or_else(|| "Unknown failure".to_string()),
                            Some(record.job.payload.clone()),
                        );
                        failure.failed_at = record.job.created_at;
                        self.failed.insert(record.job.id, failure);
                        report.failed += 1;
                    }
                },
                ListedRecord::Corrupt { id, detail, raw } => {
                    warn!(job_id = %id, error = %detail, "Journal entry is corrupt, parking in failed list");
                    let mut failure =
                        FailureRecord::new(format!("Corrupt journal entry: {detail}"), None);
                    failure.raw_payload = Some(String::from_utf8_lossy(&raw).into_owned());
                    self.failed.insert(id.clone(), failure);
                    if let Err(e) = self.store.delete(&id).await {
                        warn!(job_id = %id, error = %e, "Failed to remove corrupt journal entry");
                    }
                    report.corrupt += 1;
                }
            }
        }

        self.evict_oldest_failed().await;

        if report != RestoreReport::default() {
            internal!(
                level = INFO,
                "Restored queue: {} queued, {} re-queued, {} failed, {} corrupt",
                report.queued,
                report.requeued,
                report.failed,
                report.corrupt
            );
        }

        if report.queued + report.requeued > 0 {
            self.notify.notify_one();
        }

        Ok(report)
    }

    /// Pending-list depth.
    ///
    /// # Errors
    /// If the internal lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lists.lock()?.pending.len())
    }

    /// Whether the pending list is empty.
    ///
    /// # Errors
    /// If the internal lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Failure record for a job, if one is retained.
    #[must_use]
    pub fn failure(&self, id: &JobId) -> Option<FailureRecord> {
        self.failed.get(id).map(|entry| entry.value().clone())
    }

    // State transitions after a successful claim are journaled
    // best-effort: losing the journal write costs at most one replay
    // after a crash, not the job itself.
    async fn journal(&self, record: JobRecord) {
        let id = record.job.id.clone();
        if let Err(e) = self.store.write(&record).await {
            warn!(job_id = %id, error = %e, "Failed to journal job state transition");
        }
    }

    // Eviction drops the journal entry along with the map entry so the
    // journal directory stays bounded by the same cap, and a restart
    // cannot resurrect failures the cap already discarded.
    async fn evict_oldest_failed(&self) {
        for id in Self::evict_oldest(&self.failed, self.config.max_failed_retained) {
            if let Err(e) = self.store.delete(&id).await {
                warn!(job_id = %id, error = %e, "Failed to remove journal entry for evicted failed job");
            }
        }
    }

    fn evict_oldest<V>(map: &DashMap<JobId, V>, cap: usize) -> Vec<JobId> {
        if map.len() <= cap {
            return Vec::new();
        }

        let mut ids: Vec<JobId> = map.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        let excess = ids.len().saturating_sub(cap);
        ids.truncate(excess);
        for id in &ids {
            map.remove(id);
        }
        ids
    }
}
