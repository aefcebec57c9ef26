//! Queue configuration.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
    Result,
    store::{FileJobStore, JobStore, MemoryJobStore},
};

const fn default_max_failed_retained() -> usize {
    256
}

const fn default_max_completed_retained() -> usize {
    256
}

/// Tunables for job retention.
///
/// Failed jobs and completion summaries are kept for inspection, but
/// the maps are bounded: once a cap is exceeded the oldest entries
/// (by job id, which sorts by creation time) are evicted.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of failed jobs retained for inspection.
    #[serde(default = "default_max_failed_retained")]
    pub max_failed_retained: usize,

    /// Maximum number of completion summaries retained for status
    /// queries.
    #[serde(default = "default_max_completed_retained")]
    pub max_completed_retained: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_failed_retained: default_max_failed_retained(),
            max_completed_retained: default_max_completed_retained(),
        }
    }
}

/// Runtime selection of the journal backing store.
///
/// File-backed journal in TOML config:
/// ```toml
/// [store]
/// type = "file"
/// path = "/var/spool/outreach"
/// ```
///
/// Memory-backed journal (no durability):
/// ```toml
/// [store]
/// type = "memory"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobStoreConfig {
    /// File-based journal (production).
    File(FileJobStore),
    /// Memory-based journal (testing/development).
    Memory,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self::File(FileJobStore::default())
    }
}

impl JobStoreConfig {
    /// Convert the configuration into an initialized backing store.
    ///
    /// # Errors
    /// If file journal initialization fails (directory creation,
    /// permissions, etc.).
    pub fn into_store(self) -> Result<Arc<dyn JobStore>> {
        match self {
            Self::File(store) => {
                store.init()?;
                Ok(Arc::new(store))
            }
            Self::Memory => Ok(Arc::new(MemoryJobStore::new())),
        }
    }
}
