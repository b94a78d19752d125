#![allow(missing_docs)]

use relay_agent::{JobKind, JobRegistry, NewJob, StatusKind};

fn job(job_id: &str, owner: &str, kind: Option<JobKind>) -> NewJob {
    NewJob {
        job_id: job_id.to_string(),
        owner_user_id: owner.to_string(),
        kind_hint: kind,
        origin_url: None,
    }
}

#[tokio::test]
async fn register_is_atomic_per_job_id() {
    let registry = JobRegistry::new();
    assert!(
        registry
            .try_register(&job("job-1", "alice", Some(JobKind::VideoGeneration)))
            .await
    );
    assert!(
        !registry
            .try_register(&job("job-1", "alice", Some(JobKind::VideoGeneration)))
            .await,
        "second registration for the same job id must be rejected"
    );
    assert!(registry.contains("job-1").await);
}

#[tokio::test]
async fn delivery_claim_is_granted_once() {
    let registry = JobRegistry::new();
    assert!(
        registry
            .try_register(&job("job-2", "bob", Some(JobKind::Transcription)))
            .await
    );

    assert!(registry.claim_delivery("job-2").await);
    assert!(
        !registry.claim_delivery("job-2").await,
        "only the first claimant may deliver"
    );
    assert!(
        !registry.claim_delivery("job-unknown").await,
        "claims on unknown jobs must fail"
    );
}

#[tokio::test]
async fn remove_clears_the_user_index() {
    let registry = JobRegistry::new();
    assert!(
        registry
            .try_register(&job("job-3", "carol", Some(JobKind::VideoGeneration)))
            .await
    );
    assert!(
        registry
            .try_register(&job("job-4", "carol", Some(JobKind::Transcription)))
            .await
    );
    assert_eq!(registry.jobs_for_user("carol").await, vec!["job-3", "job-4"]);

    let removed = registry.remove("job-3").await.expect("record should exist");
    assert_eq!(removed.owner_user_id, "carol");
    assert_eq!(registry.jobs_for_user("carol").await, vec!["job-4"]);

    registry.remove("job-4").await.expect("record should exist");
    assert!(registry.jobs_for_user("carol").await.is_empty());

    let metrics = registry.metrics().await;
    assert_eq!(metrics.active_jobs, 0);
    assert_eq!(metrics.tracked_users, 0);
}

#[tokio::test]
async fn note_state_updates_the_record() {
    let registry = JobRegistry::new();
    assert!(registry.try_register(&job("job-5", "dave", None)).await);

    registry.note_state("job-5", StatusKind::Completed).await;
    let record = registry.get("job-5").await.expect("record should exist");
    assert_eq!(record.last_known_state, StatusKind::Completed);

    // Noting state on a removed job is a no-op, not a panic.
    registry.remove("job-5").await;
    registry.note_state("job-5", StatusKind::Failed).await;
    assert!(registry.get("job-5").await.is_none());
}

#[tokio::test]
async fn metrics_count_by_kind_hint() {
    let registry = JobRegistry::new();
    registry
        .try_register(&job("job-6", "erin", Some(JobKind::VideoGeneration)))
        .await;
    registry
        .try_register(&job("job-7", "erin", Some(JobKind::Transcription)))
        .await;
    registry.try_register(&job("job-8", "frank", None)).await;

    let metrics = registry.metrics().await;
    assert_eq!(metrics.active_jobs, 3);
    assert_eq!(metrics.video_jobs, 1);
    assert_eq!(metrics.transcription_jobs, 1);
    assert_eq!(metrics.tracked_users, 2);
}
