//! Video transcription backend: submission, status probing, result fetch.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::BackendSettings;
use crate::jobs::{CompletedPayload, JobKind, JobProbe, JobStatus};

use super::build_backend_http_client;

/// HTTP client for the transcription service.
pub struct TranscriberClient {
    base_url: String,
    http: reqwest::Client,
}

impl TranscriberClient {
    /// Build a client from the backend settings.
    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self {
            base_url: settings.transcriber_url.trim_end_matches('/').to_string(),
            http: build_backend_http_client(),
        }
    }

    /// Submit a video URL for transcription; returns the backend task id.
    pub async fn submit(&self, video_url: &str, summary_language: &str) -> Result<String> {
        let form = [("url", video_url), ("summary_language", summary_language)];
        let response = self
            .http
            .post(format!("{}/api/process-video", self.base_url))
            .form(&form)
            .send()
            .await
            .context("failed to reach the transcription backend")?
            .error_for_status()
            .context("transcription backend rejected the submission")?;
        let value: Value = response
            .json()
            .await
            .context("invalid response from the transcription backend")?;

        for key in ["task_id", "id"] {
            if let Some(id) = value.get(key).and_then(Value::as_str)
                && !id.is_empty()
            {
                tracing::info!(job_id = %id, "transcription job submitted");
                return Ok(id.to_string());
            }
        }
        bail!("submission accepted but the response carried no task id: {value}");
    }

    /// Fetch the full transcription result, if the backend still has one.
    pub async fn fetch_result(&self, task_id: &str) -> Result<Option<String>> {
        let response = self
            .http
            .get(format!("{}/api/task-result/{task_id}", self.base_url))
            .send()
            .await
            .context("failed to reach the transcription backend")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value: Value = response
            .error_for_status()
            .context("result lookup failed")?
            .json()
            .await
            .context("invalid result response")?;

        for key in ["result", "summary", "content"] {
            if let Some(text) = value.get(key).and_then(Value::as_str)
                && !text.trim().is_empty()
            {
                return Ok(Some(text.to_string()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl JobProbe for TranscriberClient {
    fn kind(&self) -> JobKind {
        JobKind::Transcription
    }

    async fn probe(&self, job_id: &str) -> Result<JobStatus> {
        let response = self
            .http
            .get(format!("{}/api/task-status/{job_id}", self.base_url))
            .send()
            .await
            .context("failed to reach the transcription backend")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(JobStatus::NotFound);
        }
        let value: Value = response
            .error_for_status()
            .context("status lookup failed")?
            .json()
            .await
            .context("invalid status response")?;
        Ok(map_task_status(&value))
    }
}

fn map_task_status(value: &Value) -> JobStatus {
    let status = value.get("status").and_then(Value::as_str).unwrap_or("");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match status {
        "completed" => {
            let summary = value
                .get("summary")
                .and_then(Value::as_str)
                .filter(|text| !text.trim().is_empty())
                .unwrap_or(message);
            JobStatus::Completed(CompletedPayload::Summary {
                text: summary.to_string(),
            })
        }
        "failed" | "error" => JobStatus::Failed {
            reason: if message.is_empty() {
                "transcription failed".to_string()
            } else {
                message.to_string()
            },
        },
        // `processing`, `queued`, and anything this build does not know stay
        // non-terminal; the monitor's budget bounds the wait either way.
        _ => JobStatus::Processing {
            detail: progress_detail(value, message),
        },
    }
}

fn progress_detail(value: &Value, message: &str) -> Option<String> {
    let progress = value.get("progress").and_then(Value::as_u64);
    match (progress, message.is_empty()) {
        (Some(progress), false) => Some(format!("{progress}% — {message}")),
        (Some(progress), true) => Some(format!("{progress}%")),
        (None, false) => Some(message.to_string()),
        (None, true) => None,
    }
}
