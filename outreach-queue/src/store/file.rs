use std::path::{Path, PathBuf};

use async_trait::async_trait;
use outreach_core::internal;
use serde::Deserialize;
use tokio::fs;

use crate::{QueueError, Result, SerializationError, types::JobId};

use super::{JobRecord, JobStore, ListedRecord};

/// File-based journal store.
///
/// One bincode record per job, named `{ulid}.job`. The ULID filename
/// encodes both timestamp and randomness, so a directory listing sorted
/// lexicographically is the enqueue order.
///
/// # Atomicity
/// Writes go to a `.tmp_` prefixed file first and are renamed into
/// place, so a crash mid-write never leaves a partial record where
/// `list()` would pick it up. Orphaned `.tmp_` files from previous
/// crashes are removed by `init()`.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    path: PathBuf,
}

impl Default for FileJobStore {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/spool/outreach"),
        }
    }
}

// Custom Deserialize implementation with path validation
impl<'de> Deserialize<'de> for FileJobStore {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct FileJobStoreHelper {
            path: PathBuf,
        }

        let helper = FileJobStoreHelper::deserialize(deserializer)?;
        Self::validate_path(&helper.path).map_err(serde::de::Error::custom)?;

        Ok(Self { path: helper.path })
    }
}

impl FileJobStore {
    /// Create a store rooted at `path`.
    ///
    /// # Errors
    /// If the path is relative, contains `..` components, or points
    /// into a sensitive system directory.
    pub fn new(path: PathBuf) -> Result<Self> {
        Self::validate_path(&path)?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn validate_path(path: &Path) -> Result<()> {
        for component in path.components() {
            if component == std::path::Component::ParentDir {
                return Err(QueueError::Internal(format!(
                    "Journal path cannot contain '..' components: {}",
                    path.display()
                )));
            }
        }

        if !path.is_absolute() {
            return Err(QueueError::Internal(format!(
                "Journal path must be absolute: {}",
                path.display()
            )));
        }

        let sensitive_prefixes = [
            "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev",
        ];

        for prefix in &sensitive_prefixes {
            if path.starts_with(prefix) {
                return Err(QueueError::Internal(format!(
                    "Journal path cannot be in system directory {}: {}",
                    prefix,
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Initialize the journal directory.
    ///
    /// Creates the directory if it does not exist and removes orphaned
    /// `.tmp_` files left behind by interrupted writes.
    ///
    /// # Errors
    /// If the path cannot be created or is not a directory.
    pub fn init(&self) -> Result<()> {
        internal!("Initialising job journal ...");

        let path = Path::new(&self.path);
        if !path.try_exists()? {
            internal!("{:#?} does not exist, creating...", self.path);
            std::fs::create_dir_all(path)?;
        } else if !path.is_dir() {
            return Err(QueueError::Internal(format!(
                "Expected {} to be a directory, but it is not",
                path.display()
            )));
        }

        self.cleanup_temp_files()?;

        Ok(())
    }

    fn cleanup_temp_files(&self) -> Result<()> {
        let entries = std::fs::read_dir(&self.path)?;
        let mut cleaned = 0;

        for entry in entries {
            let entry = entry?;
            let filename = entry.file_name();
            let filename_str = filename.to_string_lossy();

            if filename_str.starts_with(".tmp_") {
                std::fs::remove_file(entry.path())?;
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            internal!(
                level = INFO,
                "Cleaned up {cleaned} orphaned temp files from job journal"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn write(&self, record: &JobRecord) -> Result<()> {
        let filename = format!("{}.job", record.job.id);
        let target = self.path.join(&filename);
        let temp = self.path.join(format!(".tmp_{filename}"));

        let encoded = bincode::serde::encode_to_vec(record, bincode::config::standard())
            .map_err(SerializationError::from)?;

        fs::write(&temp, &encoded).await?;
        fs::rename(&temp, &target).await?;

        internal!(level = DEBUG, "Journaled job {} to {filename}", record.job.id);

        Ok(())
    }

    async fn list(&self) -> Result<Vec<ListedRecord>> {
        let mut entries = fs::read_dir(&self.path).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            let filename_str = filename.to_string_lossy();

            if !filename_str.starts_with(".tmp_")
                && let Some(id) = JobId::from_filename(&filename_str)
            {
                ids.push(id);
            }
        }

        // ULIDs sort lexicographically by creation time
        ids.sort();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let raw = fs::read(self.path.join(format!("{id}.job"))).await?;
            match bincode::serde::decode_from_slice::<JobRecord, _>(
                &raw,
                bincode::config::standard(),
            ) {
                Ok((record, _)) => records.push(ListedRecord::Intact(record)),
                Err(e) => records.push(ListedRecord::Corrupt {
                    id,
                    detail: e.to_string(),
                    raw,
                }),
            }
        }

        internal!(level = DEBUG, "Found {} records in job journal", records.len());

        Ok(records)
    }

    async fn delete(&self, id: &JobId) -> Result<()> {
        let target = self.path.join(format!("{id}.job"));
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::job::{Job, JobPayload};

    use super::*;

    #[test]
    fn test_path_validation() {
        assert!(FileJobStore::new(PathBuf::from("/tmp/outreach-jobs")).is_ok());
        assert!(FileJobStore::new(PathBuf::from("relative/path")).is_err());
        assert!(FileJobStore::new(PathBuf::from("/tmp/../etc/passwd")).is_err());
        assert!(FileJobStore::new(PathBuf::from("/etc/outreach")).is_err());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::new(dir.path().to_path_buf()).expect("valid path");
        store.init().expect("init");

        let job = Job::new(JobPayload::new("c1"));
        let id = job.id.clone();
        store.write(&JobRecord::queued(job)).await.expect("write");

        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        match &listed[0] {
            ListedRecord::Intact(record) => {
                assert_eq!(record.job.id, id);
                assert_eq!(record.job.payload.campaign_id, "c1");
            }
            ListedRecord::Corrupt { detail, .. } => panic!("unexpected corrupt record: {detail}"),
        }

        store.delete(&id).await.expect("delete");
        assert!(store.list().await.expect("list").is_empty());

        // Deleting again is not an error
        store.delete(&id).await.expect("idempotent delete");
    }

    #[tokio::test]
    async fn test_corrupt_records_are_surfaced_not_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::new(dir.path().to_path_buf()).expect("valid path");
        store.init().expect("init");

        let id = JobId::generate();
        std::fs::write(dir.path().join(format!("{id}.job")), b"not bincode at all")
            .expect("write garbage");

        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        match &listed[0] {
            ListedRecord::Corrupt { id: got, raw, .. } => {
                assert_eq!(got, &id);
                assert_eq!(raw.as_slice(), b"not bincode at all");
            }
            ListedRecord::Intact(_) => panic!("garbage should not decode"),
        }
    }

    #[tokio::test]
    async fn test_init_removes_orphaned_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::new(dir.path().to_path_buf()).expect("valid path");
        store.init().expect("init");

        std::fs::write(dir.path().join(".tmp_01ARZ3NDEKTSV4RRFFQ69G5FAV.job"), b"partial")
            .expect("write temp");

        store.init().expect("re-init");
        assert!(store.list().await.expect("list").is_empty());
        assert!(!dir.path().join(".tmp_01ARZ3NDEKTSV4RRFFQ69G5FAV.job").exists());
    }
}
