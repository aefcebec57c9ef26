//! Durable work queue for campaign send jobs.
//!
//! Jobs move through three named lists: pending, in-flight, and
//! failed. Claiming is atomic (at most one claimant per job), progress
//! is monotonic, and every state transition is journaled to a backing
//! store so queued and stranded jobs survive a restart.

pub mod config;
mod error;
pub mod job;
mod queue;
pub mod store;
mod types;

pub use config::{JobStoreConfig, QueueConfig};
pub use error::{QueueError, Result, SerializationError};
pub use job::{CompletionSummary, FailureRecord, Job, JobPayload, JobState, JobStatus};
pub use queue::{JobQueue, RestoreReport};
pub use store::{FileJobStore, JobRecord, JobStore, ListedRecord, MemoryJobStore, RecordedState};
pub use types::JobId;
