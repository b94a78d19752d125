//! External job backends: probe adapters and submission clients.

mod comfyui;
mod transcriber;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::jobs::{ArtifactFetcher, VideoArtifact};

pub use comfyui::ComfyUiClient;
pub use transcriber::TranscriberClient;

const BACKEND_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
const BACKEND_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

pub(super) fn build_backend_http_client() -> reqwest::Client {
    match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(BACKEND_HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(BACKEND_HTTP_REQUEST_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            tracing::warn!(
                error = %error,
                "Failed to build backend HTTP client with timeouts; falling back to default client"
            );
            reqwest::Client::new()
        }
    }
}

/// Production artifact fetcher over the two backend clients.
pub struct BackendArtifacts {
    synth: Arc<ComfyUiClient>,
    transcriber: Arc<TranscriberClient>,
}

impl BackendArtifacts {
    /// Wrap the backend clients behind the materializer's fetch seam.
    pub fn new(synth: Arc<ComfyUiClient>, transcriber: Arc<TranscriberClient>) -> Self {
        Self { synth, transcriber }
    }
}

#[async_trait]
impl ArtifactFetcher for BackendArtifacts {
    async fn fetch_video(&self, artifact: &VideoArtifact) -> Result<Vec<u8>> {
        self.synth.download(artifact).await
    }

    async fn fetch_summary(&self, job_id: &str) -> Result<Option<String>> {
        self.transcriber.fetch_result(job_id).await
    }
}
