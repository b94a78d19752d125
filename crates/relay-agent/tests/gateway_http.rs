#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use relay_agent::test_support::{Delivery, MockChannel, MockFetcher, MockProbe};
use relay_agent::{
    ArtifactFetcher, BackendSettings, ComfyUiClient, DeliverableContent, DeliveryChannel,
    GatewayState, JobKind, JobProbe, JobRegistry, JobService, Materializer, MonitorConfig,
    ProbeRouter, TranscriberClient, router,
};

struct Harness {
    state: GatewayState,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
    _media_dir: tempfile::TempDir,
}

fn harness(probes: Vec<Arc<dyn JobProbe>>, webhook_secret: Option<&str>) -> Harness {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    let config = MonitorConfig {
        initial_delay: Duration::from_millis(20),
        poll_interval: Duration::from_millis(20),
        max_attempts: 5,
        probe_timeout: Duration::from_millis(200),
        smart_wait_probes: 2,
        smart_wait_interval: Duration::from_millis(20),
        materialize_retries: 1,
    };
    let materializer = Arc::new(Materializer::new(
        MockFetcher::with_summary("unused") as Arc<dyn ArtifactFetcher>,
        media_dir.path().to_path_buf(),
        "http://localhost:8080".to_string(),
        "http://localhost:8080/files/preview.png".to_string(),
        config.materialize_retries,
    ));
    let (channel, deliveries) = MockChannel::new();
    let service = Arc::new(JobService::new(
        Arc::new(JobRegistry::new()),
        Arc::new(ProbeRouter::new(probes, config.probe_timeout)),
        materializer,
        Arc::clone(&channel) as Arc<dyn DeliveryChannel>,
        config,
    ));

    let backends = BackendSettings::default();
    let state = GatewayState {
        service,
        channel: channel as Arc<dyn DeliveryChannel>,
        synth: Arc::new(ComfyUiClient::from_settings(&backends)),
        transcriber: Arc::new(TranscriberClient::from_settings(&backends)),
        media_dir: media_dir.path().to_path_buf(),
        webhook_secret: webhook_secret.map(str::to_string),
    };
    Harness {
        state,
        deliveries,
        _media_dir: media_dir,
    }
}

fn no_probes() -> Vec<Arc<dyn JobProbe>> {
    Vec::new()
}

#[tokio::test]
async fn health_reports_the_registry_snapshot() {
    let h = harness(no_probes(), None);
    let app = router(h.state);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_jobs"], 0);
    assert_eq!(body["tracked_users"], 0);
}

#[tokio::test]
async fn webhook_requires_the_shared_secret_when_configured() {
    let h = harness(no_probes(), Some("shh"));
    let app = router(h.state);

    let missing = app
        .clone()
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"events":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let with_secret = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .header("x-relay-webhook-secret", "shh")
                .body(Body::from(r#"{"events":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(with_secret.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_command_replies_not_found_for_an_unknown_job() {
    let synth = MockProbe::never_found(JobKind::VideoGeneration);
    let transcriber = MockProbe::never_found(JobKind::Transcription);
    let mut h = harness(
        vec![
            Arc::clone(&synth) as Arc<dyn JobProbe>,
            Arc::clone(&transcriber) as Arc<dyn JobProbe>,
        ],
        None,
    );
    let app = router(h.state);

    let event = serde_json::json!({
        "events": [{
            "type": "message",
            "replyToken": "tok-1",
            "source": {"type": "user", "userId": "U123"},
            "message": {"type": "text", "id": "1", "text": "status job-00000001"}
        }]
    });
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let delivery = tokio::time::timeout(Duration::from_secs(2), h.deliveries.recv())
        .await
        .expect("reply should be sent")
        .expect("channel stays open");
    match delivery {
        Delivery::Reply {
            reply_token,
            content,
        } => {
            assert_eq!(reply_token, "tok-1");
            match content {
                DeliverableContent::Text(text) => {
                    assert!(text.contains("was not found"), "unexpected reply {text}")
                }
                other => panic!("expected text, got {other:?}"),
            }
        }
        other => panic!("a reply token must be answered with a reply, got {other:?}"),
    }
}

#[tokio::test]
async fn media_endpoint_serves_only_flat_file_names() {
    let h = harness(no_probes(), None);
    std::fs::write(h.state.media_dir.join("render-1.mp4"), b"mp4 bytes").unwrap();
    let app = router(h.state);

    let ok = app
        .clone()
        .oneshot(Request::get("/files/render-1.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(
        ok.headers().get("content-type").unwrap(),
        "video/mp4"
    );
    let bytes = to_bytes(ok.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"mp4 bytes");

    let missing = app
        .clone()
        .oneshot(Request::get("/files/other.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let traversal = app
        .oneshot(
            Request::get("/files/..%2Frelay-secrets.yaml")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(traversal.status(), StatusCode::NOT_FOUND);
}
