/// Identifier for a send job.
///
/// A ULID: the timestamp component gives jobs a rough chronological
/// ordering, the random suffix makes collisions across concurrent
/// enqueues negligible. The string form doubles as the journal
/// filename for file-backed stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId {
    id: ulid::Ulid,
}

impl JobId {
    /// Parse a job ID from a journal filename like `01ARYZ6S41.job`.
    ///
    /// Validates that the filename is a valid ULID to prevent path
    /// traversal attacks: path separators, `..` patterns, and anything
    /// that is not a ULID are rejected.
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.contains('/') || filename.contains('\\') {
            return None;
        }

        if filename.contains("..") {
            return None;
        }

        let stem = filename.strip_suffix(".job")?;
        let id = ulid::Ulid::from_string(stem).ok()?;

        Some(Self { id })
    }

    /// Generate a new unique job ID.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: ulid::Ulid::new(),
        }
    }

    /// Get the underlying ULID.
    #[must_use]
    pub const fn ulid(&self) -> ulid::Ulid {
        self.id
    }

    /// Milliseconds since the Unix epoch encoded in this ID.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.id.timestamp_ms()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl std::str::FromStr for JobId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            id: ulid::Ulid::from_string(s)?,
        })
    }
}

impl serde::Serialize for JobId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let id = ulid::Ulid::from_string(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_filename_validation() {
        // Valid ULIDs (26 characters)
        assert!(JobId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.job").is_some());

        // Invalid IDs (security)
        assert!(JobId::from_filename("../etc/passwd.job").is_none());
        assert!(JobId::from_filename("foo/bar.job").is_none());
        assert!(JobId::from_filename("..\\windows\\system32.job").is_none());

        // Invalid IDs (format)
        assert!(JobId::from_filename("not_a_valid_ulid.job").is_none());
        assert!(JobId::from_filename("1234567890.job").is_none());

        // Wrong extension
        assert!(JobId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin").is_none());
    }

    #[test]
    fn test_job_ids_sort_chronologically() {
        let earlier = JobId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = JobId::generate();
        assert!(earlier < later);
    }
}
