//! Journal backing stores for the job queue.
//!
//! Every queue state transition is mirrored into a [`JobStore`] so the
//! pending list (and any stranded in-flight job) can be rebuilt after a
//! restart. Completed jobs are deleted from the journal; failed jobs
//! stay until evicted by the retention cap.

mod file;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use file::FileJobStore;
pub use memory::MemoryJobStore;

use crate::{Result, job::Job, types::JobId};

/// The queue-side state a job was last journaled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordedState {
    Queued,
    InFlight,
    Failed,
}

/// One journal entry: the job envelope plus its recorded state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job: Job,
    pub state: RecordedState,
    /// Failure reason, present only for `Failed` records.
    #[serde(default)]
    pub reason: Option<String>,
}

impl JobRecord {
    #[must_use]
    pub const fn queued(job: Job) -> Self {
        Self {
            job,
            state: RecordedState::Queued,
            reason: None,
        }
    }

    #[must_use]
    pub const fn in_flight(job: Job) -> Self {
        Self {
            job,
            state: RecordedState::InFlight,
            reason: None,
        }
    }

    #[must_use]
    pub const fn failed(job: Job, reason: String) -> Self {
        Self {
            job,
            state: RecordedState::Failed,
            reason: Some(reason),
        }
    }
}

/// A journal entry as read back at restore time.
///
/// A record that no longer decodes is surfaced rather than silently
/// skipped, so the queue can park it in the failed list with its raw
/// bytes captured for diagnosis.
#[derive(Debug, Clone)]
pub enum ListedRecord {
    Intact(JobRecord),
    Corrupt {
        id: JobId,
        detail: String,
        raw: Vec<u8>,
    },
}

/// Persistence seam for job journal entries.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Insert or overwrite the journal entry for a job.
    ///
    /// # Errors
    /// If the entry cannot be written.
    async fn write(&self, record: &JobRecord) -> Result<()>;

    /// All journal entries, sorted by job id (which sorts by creation
    /// time).
    ///
    /// # Errors
    /// If the journal cannot be read.
    async fn list(&self) -> Result<Vec<ListedRecord>>;

    /// Remove the journal entry for a job. Removing an absent entry is
    /// not an error.
    ///
    /// # Errors
    /// If the entry exists but cannot be removed.
    async fn delete(&self, id: &JobId) -> Result<()>;
}
