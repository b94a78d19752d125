//! HTTP surface: webhook ingress, materialized media files, health.

mod commands;
mod replies;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::backends::{ComfyUiClient, TranscriberClient};
use crate::channels::DeliveryChannel;
use crate::jobs::JobService;

use webhook::handle_webhook;

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct GatewayState {
    /// Monitoring core handle.
    pub service: Arc<JobService>,
    /// Outbound delivery channel.
    pub channel: Arc<dyn DeliveryChannel>,
    /// Video synthesis submission client.
    pub synth: Arc<ComfyUiClient>,
    /// Transcription submission client.
    pub transcriber: Arc<TranscriberClient>,
    /// Directory the materializer stores video files in.
    pub media_dir: PathBuf,
    /// Shared secret required on webhook calls, when set.
    pub webhook_secret: Option<String>,
}

/// Response body for the health endpoint.
#[derive(Debug, Serialize)]
pub struct GatewayHealthResponse {
    /// Fixed "healthy" marker.
    pub status: &'static str,
    /// Monitors currently tracked.
    pub active_jobs: usize,
    /// Active monitors hinted as video generation.
    pub video_jobs: usize,
    /// Active monitors hinted as transcription.
    pub transcription_jobs: usize,
    /// Users with at least one active job.
    pub tracked_users: usize,
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/webhook", post(handle_webhook))
        .route("/files/{name}", get(serve_media))
        .with_state(state)
}

async fn handle_health(State(state): State<GatewayState>) -> Json<GatewayHealthResponse> {
    let metrics = state.service.registry().metrics().await;
    Json(GatewayHealthResponse {
        status: "healthy",
        active_jobs: metrics.active_jobs,
        video_jobs: metrics.video_jobs,
        transcription_jobs: metrics.transcription_jobs,
        tracked_users: metrics.tracked_users,
    })
}

async fn serve_media(
    State(state): State<GatewayState>,
    UrlPath(name): UrlPath<String>,
) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), (StatusCode, String)> {
    // The media directory is flat; anything path-like is not ours to serve.
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err((StatusCode::NOT_FOUND, "no such file".to_string()));
    }
    let path = state.media_dir.join(&name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "no such file".to_string()))?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes))
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("mp4") => "video/mp4",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("vtt") => "text/vtt",
        _ => "application/octet-stream",
    }
}

/// Run the HTTP server on `bind_addr` (e.g. `0.0.0.0:8080`).
///
/// Graceful shutdown on Ctrl+C (SIGINT) and SIGTERM (Unix); in-flight
/// requests complete before exit. Background monitors are fire-and-forget:
/// any still polling at shutdown are lost along with their registry state.
pub async fn run_http(state: GatewayState, bind_addr: &str) -> Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("gateway listening on {} (Ctrl+C/SIGTERM to stop)", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let ctrl_c = tokio::signal::ctrl_c();
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            let _ = ctrl_c.await;
            return;
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
