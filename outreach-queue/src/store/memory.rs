use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{Result, types::JobId};

use super::{JobRecord, JobStore, ListedRecord};

/// In-memory journal store.
///
/// Offers no durability across restarts; intended for tests and for
/// deployments that explicitly opt out of a journal.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    records: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of journaled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn write(&self, record: &JobRecord) -> Result<()> {
        self.records
            .write()?
            .insert(record.job.id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ListedRecord>> {
        let mut records: Vec<JobRecord> = self.records.read()?.values().cloned().collect();
        records.sort_by(|a, b| a.job.id.cmp(&b.job.id));
        Ok(records.into_iter().map(ListedRecord::Intact).collect())
    }

    async fn delete(&self, id: &JobId) -> Result<()> {
        self.records.write()?.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::job::{Job, JobPayload};

    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryJobStore::new();
        let job = Job::new(JobPayload::new("c1"));
        let id = job.id.clone();

        store.write(&JobRecord::queued(job)).await.expect("write");
        assert_eq!(store.len(), 1);

        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        match &listed[0] {
            ListedRecord::Intact(record) => assert_eq!(record.job.id, id),
            ListedRecord::Corrupt { .. } => panic!("memory store never yields corrupt records"),
        }

        store.delete(&id).await.expect("delete");
        assert!(store.is_empty());
    }
}
