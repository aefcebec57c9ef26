//! The job envelope and its status types.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Structured job payload, validated once at enqueue time.
///
/// The worker loop never re-parses untrusted strings: enqueuing a
/// payload that deserializes is the only way into the pending list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub campaign_id: String,
}

impl JobPayload {
    #[must_use]
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
        }
    }
}

/// One queued unit of work: sending one campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub payload: JobPayload,
    /// Unix timestamp (seconds) when the job was enqueued.
    pub created_at: u64,
    /// Progress percentage, 0-100. Only the worker loop writes this,
    /// and it never decreases.
    pub progress: u8,
    /// Unix timestamp (seconds) when the job was claimed, if it has
    /// been.
    #[serde(default)]
    pub claimed_at: Option<u64>,
}

impl Job {
    #[must_use]
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: JobId::generate(),
            payload,
            created_at: unix_now(),
            progress: 0,
            claimed_at: None,
        }
    }

    pub(crate) fn mark_claimed(&mut self) {
        self.claimed_at = Some(unix_now());
    }
}

/// Externally visible job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    /// The queue has no memory of this job id.
    Unknown,
}

/// Aggregate counts stored when a job completes.
///
/// Per-recipient detail lives only in the outcome records; status
/// queries surface these totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub total: u32,
    pub sent: u32,
    pub errors: u32,
    pub finished_at: u64,
}

impl CompletionSummary {
    #[must_use]
    pub fn new(total: u32, sent: u32, errors: u32) -> Self {
        Self {
            total,
            sent,
            errors,
            finished_at: unix_now(),
        }
    }
}

/// Retained record of a failed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub reason: String,
    pub failed_at: u64,
    /// The parsed payload, when it was available.
    #[serde(default)]
    pub payload: Option<JobPayload>,
    /// Raw journal bytes (lossy UTF-8) captured when a job record
    /// could not be decoded, kept for diagnosis.
    #[serde(default)]
    pub raw_payload: Option<String>,
}

impl FailureRecord {
    #[must_use]
    pub fn new(reason: impl Into<String>, payload: Option<JobPayload>) -> Self {
        Self {
            reason: reason.into(),
            failed_at: unix_now(),
            payload,
            raw_payload: None,
        }
    }
}

/// Answer to a status query for a job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: u8,
    /// Failure reason, for failed jobs.
    #[serde(default)]
    pub detail: Option<String>,
    /// Aggregate counts, for completed jobs.
    #[serde(default)]
    pub summary: Option<CompletionSummary>,
}

impl JobStatus {
    pub(crate) const UNKNOWN: Self = Self {
        state: JobState::Unknown,
        progress: 0,
        detail: None,
        summary: None,
    };
}
