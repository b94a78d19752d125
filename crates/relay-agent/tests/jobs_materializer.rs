#![allow(missing_docs)]

use std::sync::Arc;

use relay_agent::test_support::MockFetcher;
use relay_agent::{
    ArtifactFetcher, CompletedPayload, DeliverableContent, MaterializeError, Materializer,
    VideoArtifact,
};

fn materializer(fetcher: Arc<MockFetcher>, media_dir: &tempfile::TempDir) -> Materializer {
    Materializer::new(
        fetcher as Arc<dyn ArtifactFetcher>,
        media_dir.path().to_path_buf(),
        "https://bot.example.com".to_string(),
        "https://bot.example.com/files/preview.png".to_string(),
        2,
    )
}

fn video_payload(filename: &str) -> CompletedPayload {
    CompletedPayload::Video(VideoArtifact {
        filename: filename.to_string(),
        subfolder: "runs".to_string(),
        folder_type: "output".to_string(),
    })
}

#[tokio::test]
async fn video_materialization_is_idempotent() {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    let fetcher = MockFetcher::with_video(vec![9; 64]);
    let materializer = materializer(Arc::clone(&fetcher), &media_dir);
    let payload = video_payload("clip_0001.mp4");

    let first = materializer
        .materialize("render-10", &payload)
        .await
        .expect("first materialization succeeds");
    let second = materializer
        .materialize("render-10", &payload)
        .await
        .expect("second materialization succeeds");

    assert_eq!(first, second);
    assert_eq!(fetcher.video_calls(), 1, "the stored file is reused");
    match first {
        DeliverableContent::Video { url, preview_url } => {
            assert_eq!(url, "https://bot.example.com/files/render-10.mp4");
            assert_eq!(preview_url, "https://bot.example.com/files/preview.png");
        }
        other => panic!("expected a video, got {other:?}"),
    }

    let stored = std::fs::read(media_dir.path().join("render-10.mp4")).expect("file exists");
    assert_eq!(stored, vec![9; 64]);
}

#[tokio::test]
async fn flaky_video_fetch_is_retried_within_the_budget() {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    let fetcher = MockFetcher::with_flaky_video(vec![1, 2, 3], 1);
    let materializer = materializer(Arc::clone(&fetcher), &media_dir);

    materializer
        .materialize("render-11", &video_payload("clip.mp4"))
        .await
        .expect("retry should recover");
    assert_eq!(fetcher.video_calls(), 2);
}

#[tokio::test]
async fn video_fetch_gives_up_after_the_retry_budget() {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    let fetcher = MockFetcher::with_flaky_video(vec![1, 2, 3], 10);
    let materializer = Materializer::new(
        Arc::clone(&fetcher) as Arc<dyn ArtifactFetcher>,
        media_dir.path().to_path_buf(),
        "https://bot.example.com".to_string(),
        "https://bot.example.com/files/preview.png".to_string(),
        1,
    );

    let error = materializer
        .materialize("render-12", &video_payload("clip.mp4"))
        .await
        .expect_err("fetch never succeeds");
    assert!(matches!(error, MaterializeError::Fetch(_)));
    assert_eq!(fetcher.video_calls(), 2, "initial attempt plus one retry");
}

#[tokio::test]
async fn blank_or_empty_video_payloads_are_rejected() {
    let media_dir = tempfile::tempdir().expect("temp media dir");

    let fetcher = MockFetcher::with_video(vec![1]);
    let error = materializer(Arc::clone(&fetcher), &media_dir)
        .materialize("render-13", &video_payload("   "))
        .await
        .expect_err("blank filename is unusable");
    assert!(matches!(error, MaterializeError::EmptyPayload));
    assert_eq!(fetcher.video_calls(), 0, "nothing to fetch");

    let empty = MockFetcher::with_video(Vec::new());
    let error = materializer(Arc::clone(&empty), &media_dir)
        .materialize("render-14", &video_payload("clip.mp4"))
        .await
        .expect_err("zero-byte downloads are unusable");
    assert!(matches!(error, MaterializeError::EmptyPayload));
}

#[tokio::test]
async fn summary_upgrades_to_the_full_result_when_available() {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    let fetcher = MockFetcher::with_summary("the full summary");
    let content = materializer(Arc::clone(&fetcher), &media_dir)
        .materialize(
            "task-20",
            &CompletedPayload::Summary {
                text: "probe preview".to_string(),
            },
        )
        .await
        .expect("materialization succeeds");
    assert_eq!(
        content,
        DeliverableContent::Text("the full summary".to_string())
    );
    assert_eq!(fetcher.summary_calls(), 1);
}

#[tokio::test]
async fn summary_falls_back_to_the_probe_text() {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    // A video-only fetcher has no fuller summary to offer.
    let fetcher = MockFetcher::with_video(vec![1]);
    let content = materializer(Arc::clone(&fetcher), &media_dir)
        .materialize(
            "task-21",
            &CompletedPayload::Summary {
                text: "probe preview".to_string(),
            },
        )
        .await
        .expect("fallback succeeds");
    assert_eq!(
        content,
        DeliverableContent::Text("probe preview".to_string())
    );

    let error = materializer(Arc::clone(&fetcher), &media_dir)
        .materialize("task-22", &CompletedPayload::Summary { text: "  ".to_string() })
        .await
        .expect_err("nothing deliverable anywhere");
    assert!(matches!(error, MaterializeError::EmptyPayload));
}
