//! Turns a completed job payload into content ready for delivery.
//!
//! Materialization is idempotent: a video that was already downloaded by an
//! earlier attempt is reused instead of re-fetched, so retried deliveries and
//! the monitor/query race cannot double-fetch from the backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use super::types::{CompletedPayload, DeliverableContent, VideoArtifact};

const FETCH_RETRY_BASE_MS: u64 = 500;
const FETCH_RETRY_MAX_MS: u64 = 5_000;

/// Fetch seam over the backend clients so tests can substitute doubles.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download a rendered video from the synthesis backend.
    async fn fetch_video(&self, artifact: &VideoArtifact) -> Result<Vec<u8>>;

    /// Fetch the full transcription result, if the backend still has one.
    async fn fetch_summary(&self, job_id: &str) -> Result<Option<String>>;
}

/// Why materialization gave up.
///
/// These reduce to a `Failed`-equivalent outcome at the call sites; the
/// monitor logs and cleans up instead of propagating.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The completed payload carried nothing deliverable.
    #[error("completed payload carried no usable content")]
    EmptyPayload,
    /// The artifact fetch kept failing past the retry budget.
    #[error("failed to fetch job artifact: {0}")]
    Fetch(#[source] anyhow::Error),
    /// The media directory write failed.
    #[error("failed to store job artifact: {0}")]
    Store(#[from] std::io::Error),
}

/// Prepares deliverable content from completed payloads.
pub struct Materializer {
    fetcher: Arc<dyn ArtifactFetcher>,
    media_dir: PathBuf,
    public_base_url: String,
    preview_image_url: String,
    retry_budget: u32,
}

impl Materializer {
    /// Build a materializer storing videos under `media_dir` and exposing
    /// them below `public_base_url`.
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        media_dir: PathBuf,
        public_base_url: String,
        preview_image_url: String,
        retry_budget: u32,
    ) -> Self {
        Self {
            fetcher,
            media_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            preview_image_url,
            retry_budget,
        }
    }

    /// Materialize `payload` for `job_id`. Safe to call more than once for
    /// the same job.
    pub async fn materialize(
        &self,
        job_id: &str,
        payload: &CompletedPayload,
    ) -> Result<DeliverableContent, MaterializeError> {
        match payload {
            CompletedPayload::Video(artifact) => self.materialize_video(job_id, artifact).await,
            CompletedPayload::Summary { text } => self.materialize_summary(job_id, text).await,
        }
    }

    async fn materialize_video(
        &self,
        job_id: &str,
        artifact: &VideoArtifact,
    ) -> Result<DeliverableContent, MaterializeError> {
        if artifact.filename.trim().is_empty() {
            return Err(MaterializeError::EmptyPayload);
        }

        let file_name = format!("{job_id}.mp4");
        let path = self.media_dir.join(&file_name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(%job_id, path = %path.display(), "video already materialized; reusing");
        } else {
            let bytes = self.fetch_video_with_retry(job_id, artifact).await?;
            if bytes.is_empty() {
                return Err(MaterializeError::EmptyPayload);
            }
            tokio::fs::create_dir_all(&self.media_dir).await?;
            tokio::fs::write(&path, &bytes).await?;
            tracing::info!(%job_id, bytes = bytes.len(), path = %path.display(), "video artifact stored");
        }

        Ok(DeliverableContent::Video {
            url: format!("{}/files/{file_name}", self.public_base_url),
            preview_url: self.preview_image_url.clone(),
        })
    }

    async fn materialize_summary(
        &self,
        job_id: &str,
        fallback: &str,
    ) -> Result<DeliverableContent, MaterializeError> {
        for attempt in 0..=self.retry_budget {
            match self.fetcher.fetch_summary(job_id).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    return Ok(DeliverableContent::Text(text));
                }
                // The backend has no fuller result; use the probe's summary.
                Ok(_) => break,
                Err(error) if attempt < self.retry_budget => {
                    let delay = retry_delay(attempt);
                    tracing::warn!(
                        %job_id,
                        attempt,
                        retry_budget = self.retry_budget,
                        error = %error,
                        "summary fetch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    tracing::warn!(%job_id, error = %error, "summary fetch exhausted retries; using probe summary");
                    break;
                }
            }
        }

        if fallback.trim().is_empty() {
            Err(MaterializeError::EmptyPayload)
        } else {
            Ok(DeliverableContent::Text(fallback.to_string()))
        }
    }

    async fn fetch_video_with_retry(
        &self,
        job_id: &str,
        artifact: &VideoArtifact,
    ) -> Result<Vec<u8>, MaterializeError> {
        let mut attempt = 0;
        loop {
            match self.fetcher.fetch_video(artifact).await {
                Ok(bytes) => return Ok(bytes),
                Err(error) if attempt < self.retry_budget => {
                    let delay = retry_delay(attempt);
                    tracing::warn!(
                        %job_id,
                        attempt,
                        retry_budget = self.retry_budget,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "video fetch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(MaterializeError::Fetch(error)),
            }
        }
    }
}

fn retry_delay(attempt: u32) -> Duration {
    let shift = attempt.min(10);
    let backoff_ms = FETCH_RETRY_BASE_MS
        .saturating_mul(1_u64 << shift)
        .min(FETCH_RETRY_MAX_MS);
    Duration::from_millis(backoff_ms)
}
