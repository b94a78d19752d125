#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use relay_agent::test_support::{MockProbe, ProbeResponse};
use relay_agent::{CompletedPayload, JobKind, JobProbe, JobStatus, ProbeRouter};

const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

fn processing() -> JobStatus {
    JobStatus::Processing { detail: None }
}

fn completed_summary(text: &str) -> JobStatus {
    JobStatus::Completed(CompletedPayload::Summary {
        text: text.to_string(),
    })
}

fn router_over(probes: Vec<Arc<dyn JobProbe>>) -> ProbeRouter {
    ProbeRouter::new(probes, PROBE_TIMEOUT)
}

#[tokio::test]
async fn first_definitive_answer_wins() {
    let synth = MockProbe::never_found(JobKind::VideoGeneration);
    let transcriber = MockProbe::always(JobKind::Transcription, processing());
    let router = router_over(vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ]);

    let resolved = router
        .resolve("task-1000")
        .await
        .expect("the transcriber knows the job");
    assert_eq!(resolved.kind, JobKind::Transcription);
    assert_eq!(resolved.status, processing());
}

#[tokio::test]
async fn unknown_everywhere_resolves_to_none() {
    let synth = MockProbe::never_found(JobKind::VideoGeneration);
    let transcriber = MockProbe::never_found(JobKind::Transcription);
    let router = router_over(vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ]);

    assert!(router.resolve("task-1001").await.is_none());
    assert_eq!(synth.calls(), 1);
    assert_eq!(transcriber.calls(), 1);
}

#[tokio::test]
async fn erroring_probe_degrades_to_no_answer() {
    let synth = MockProbe::new(
        JobKind::VideoGeneration,
        vec![ProbeResponse::Error("connection refused".to_string())],
    );
    let transcriber = MockProbe::always(JobKind::Transcription, completed_summary("done"));
    let router = router_over(vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ]);

    let resolved = router
        .resolve("task-1002")
        .await
        .expect("the healthy probe still answers");
    assert_eq!(resolved.kind, JobKind::Transcription);

    // Both probes erroring is indistinguishable from unknown everywhere.
    let broken = router_over(vec![
        MockProbe::new(
            JobKind::VideoGeneration,
            vec![ProbeResponse::Error("boom".to_string())],
        ) as Arc<dyn JobProbe>,
    ]);
    assert!(broken.resolve("task-1002").await.is_none());
}

#[tokio::test]
async fn hanging_probe_is_cut_off_by_the_per_probe_timeout() {
    let synth = MockProbe::new(JobKind::VideoGeneration, vec![ProbeResponse::Hang]);
    let transcriber = MockProbe::always(JobKind::Transcription, processing());
    let router = router_over(vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ]);

    let resolved = tokio::time::timeout(Duration::from_secs(1), router.resolve("task-1003"))
        .await
        .expect("resolve must not wait for the hanging probe");
    assert_eq!(resolved.expect("the fast probe answers").kind, JobKind::Transcription);

    // Every probe hanging resolves to None once the timeouts fire.
    let all_hang = router_over(vec![
        MockProbe::new(JobKind::VideoGeneration, vec![ProbeResponse::Hang]) as Arc<dyn JobProbe>,
    ]);
    let outcome = tokio::time::timeout(Duration::from_secs(1), all_hang.resolve("task-1003"))
        .await
        .expect("timeouts bound the fan-out");
    assert!(outcome.is_none());
}

#[tokio::test]
async fn definitive_answer_is_cached_to_skip_the_fan_out() {
    let synth = MockProbe::never_found(JobKind::VideoGeneration);
    let transcriber = MockProbe::always(JobKind::Transcription, processing());
    let router = router_over(vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ]);

    router.resolve("task-1004").await.expect("first resolve");
    router.resolve("task-1004").await.expect("second resolve");
    router.resolve("task-1004").await.expect("third resolve");

    // Only the first resolve fans out; later ones go straight to the cached backend.
    assert_eq!(synth.calls(), 1);
    assert_eq!(transcriber.calls(), 3);
}

#[tokio::test]
async fn forget_evicts_the_cached_backend() {
    let synth = MockProbe::never_found(JobKind::VideoGeneration);
    let transcriber = MockProbe::always(JobKind::Transcription, processing());
    let router = router_over(vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ]);

    router.resolve("task-1005").await.expect("first resolve");
    router.forget("task-1005").await;
    router.resolve("task-1005").await.expect("second resolve");

    assert_eq!(synth.calls(), 2, "eviction forces a fresh fan-out");
}

#[tokio::test]
async fn wrong_seed_falls_back_to_the_full_fan_out() {
    let synth = MockProbe::never_found(JobKind::VideoGeneration);
    let transcriber = MockProbe::always(JobKind::Transcription, processing());
    let router = router_over(vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ]);

    // A submission-time hint can be wrong; NotFound from the hinted backend
    // must not hide the job from the others.
    router.seed("task-1006", JobKind::VideoGeneration).await;
    let resolved = router
        .resolve("task-1006")
        .await
        .expect("fallback fan-out finds the job");
    assert_eq!(resolved.kind, JobKind::Transcription);

    // The corrected association sticks.
    router.resolve("task-1006").await.expect("cached resolve");
    assert_eq!(synth.calls(), 2, "hinted probe plus one fan-out round");
}
