//! Tests for queue restoration across restart.
//!
//! A restart is simulated by dropping one `JobQueue` and building a new
//! one over the same journal directory. Verified here:
//! 1. Queued jobs survive in their original order
//! 2. Jobs stranded in-flight are re-queued at the head
//! 3. Failed jobs keep their reason
//! 4. Corrupt journal entries are parked in the failed list with the
//!    raw bytes captured
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use outreach_queue::{
    CompletionSummary, FileJobStore, JobPayload, JobQueue, JobState, QueueConfig,
};

fn queue_at(dir: &std::path::Path) -> JobQueue {
    queue_with_config(dir, QueueConfig::default())
}

fn queue_with_config(dir: &std::path::Path, config: QueueConfig) -> JobQueue {
    let store = FileJobStore::new(dir.to_path_buf()).expect("valid journal path");
    store.init().expect("init journal");
    JobQueue::new(Arc::new(store), config)
}

fn journal_entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .expect("read journal dir")
        .filter(|entry| {
            entry
                .as_ref()
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .ends_with(".job")
        })
        .count()
}

#[tokio::test]
async fn queued_jobs_survive_restart_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first;
    let second;
    {
        let queue = queue_at(dir.path());
        first = queue.enqueue(JobPayload::new("c1")).await.expect("enqueue");
        tokio::time::sleep(Duration::from_millis(2)).await;
        second = queue.enqueue(JobPayload::new("c2")).await.expect("enqueue");
    }

    let restarted = queue_at(dir.path());
    let report = restarted.restore().await.expect("restore");
    assert_eq!(report.queued, 2);
    assert_eq!(report.requeued, 0);

    let a = restarted
        .claim_next(Duration::from_millis(10))
        .await
        .expect("claim")
        .expect("job available");
    let b = restarted
        .claim_next(Duration::from_millis(10))
        .await
        .expect("claim")
        .expect("job available");
    assert_eq!(a.id, first);
    assert_eq!(b.id, second);
}

#[tokio::test]
async fn stranded_in_flight_job_is_requeued_at_the_head() {
    let dir = tempfile::tempdir().expect("tempdir");

    let stranded;
    let waiting;
    {
        let queue = queue_at(dir.path());
        stranded = queue.enqueue(JobPayload::new("c1")).await.expect("enqueue");
        tokio::time::sleep(Duration::from_millis(2)).await;
        waiting = queue.enqueue(JobPayload::new("c2")).await.expect("enqueue");

        // Claim the first job and then "crash" without releasing it
        let claimed = queue
            .claim_next(Duration::from_millis(10))
            .await
            .expect("claim")
            .expect("job available");
        assert_eq!(claimed.id, stranded);
    }

    let restarted = queue_at(dir.path());
    let report = restarted.restore().await.expect("restore");
    assert_eq!(report.queued, 1);
    assert_eq!(report.requeued, 1);

    // The stranded job comes back first, ahead of the one that was
    // still pending, with its progress reset
    let retry = restarted
        .claim_next(Duration::from_millis(10))
        .await
        .expect("claim")
        .expect("job available");
    assert_eq!(retry.id, stranded);
    assert_eq!(retry.progress, 0);

    let next = restarted
        .claim_next(Duration::from_millis(10))
        .await
        .expect("claim")
        .expect("job available");
    assert_eq!(next.id, waiting);
}

#[tokio::test]
async fn completed_jobs_leave_no_journal_entry() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let queue = queue_at(dir.path());
        let id = queue.enqueue(JobPayload::new("c1")).await.expect("enqueue");
        queue
            .claim_next(Duration::from_millis(10))
            .await
            .expect("claim")
            .expect("job available");
        queue
            .release_completed(&id, CompletionSummary::new(5, 5, 0))
            .await
            .expect("release");
    }

    let restarted = queue_at(dir.path());
    let report = restarted.restore().await.expect("restore");
    assert_eq!(report.queued + report.requeued + report.failed + report.corrupt, 0);
}

#[tokio::test]
async fn failed_jobs_survive_restart_with_their_reason() {
    let dir = tempfile::tempdir().expect("tempdir");

    let id;
    {
        let queue = queue_at(dir.path());
        id = queue.enqueue(JobPayload::new("c1")).await.expect("enqueue");
        queue
            .claim_next(Duration::from_millis(10))
            .await
            .expect("claim")
            .expect("job available");
        queue
            .release_failed(&id, "Campaign not found: c1")
            .await
            .expect("release");
    }

    let restarted = queue_at(dir.path());
    let report = restarted.restore().await.expect("restore");
    assert_eq!(report.failed, 1);

    let status = restarted.status(&id).expect("status");
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.detail.as_deref(), Some("Campaign not found: c1"));
}

#[tokio::test]
async fn failed_job_eviction_prunes_the_journal_too() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = QueueConfig {
        max_failed_retained: 2,
        max_completed_retained: 2,
    };

    let mut ids = Vec::new();
    {
        let queue = queue_with_config(dir.path(), config.clone());
        for i in 0..5 {
            // Distinct ULID timestamps so eviction order is deterministic
            tokio::time::sleep(Duration::from_millis(2)).await;
            let id = queue
                .enqueue(JobPayload::new(format!("c{i}")))
                .await
                .expect("enqueue");
            queue
                .claim_next(Duration::from_millis(10))
                .await
                .expect("claim")
                .expect("job available");
            queue.release_failed(&id, "boom").await.expect("release");
            ids.push(id);
        }
    }

    // The journal is bounded by the same cap as the failed map
    assert_eq!(journal_entries(dir.path()), 2);

    // A restart only sees the retained failures; evicted ones do not
    // come back
    let restarted = queue_with_config(dir.path(), config);
    let report = restarted.restore().await.expect("restore");
    assert_eq!(report.failed, 2);
    assert_eq!(
        restarted.status(&ids[0]).expect("status").state,
        JobState::Unknown
    );
    assert_eq!(
        restarted.status(&ids[4]).expect("status").state,
        JobState::Failed
    );
}

#[tokio::test]
async fn corrupt_journal_entries_are_parked_with_raw_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let queue = queue_at(dir.path());
        queue.enqueue(JobPayload::new("c1")).await.expect("enqueue");
    }

    // Garbage record dropped into the journal by hand
    let bogus_id = outreach_queue::JobId::generate();
    std::fs::write(
        dir.path().join(format!("{bogus_id}.job")),
        b"mangled payload bytes",
    )
    .expect("write garbage");

    let restarted = queue_at(dir.path());
    let report = restarted.restore().await.expect("restore");
    assert_eq!(report.queued, 1);
    assert_eq!(report.corrupt, 1);

    let status = restarted.status(&bogus_id).expect("status");
    assert_eq!(status.state, JobState::Failed);

    let failure = restarted.failure(&bogus_id).expect("failure record");
    assert!(failure.reason.contains("Corrupt journal entry"));
    assert_eq!(
        failure.raw_payload.as_deref(),
        Some("mangled payload bytes")
    );

    // The corrupt file is removed so the next restore is clean
    assert!(!dir.path().join(format!("{bogus_id}.job")).exists());
}
