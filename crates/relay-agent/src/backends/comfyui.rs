//! ComfyUI-style workflow renderer: video synthesis submission + probing.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;

use crate::config::BackendSettings;
use crate::jobs::{CompletedPayload, JobKind, JobProbe, JobStatus, VideoArtifact};

use super::build_backend_http_client;

const CLIENT_ID: &str = "relay-agent";

/// HTTP client for one ComfyUI-compatible renderer.
pub struct ComfyUiClient {
    base_url: String,
    workflow_template: PathBuf,
    script_node_id: String,
    speech_api_url: String,
    http: reqwest::Client,
}

impl ComfyUiClient {
    /// Build a client from the backend settings.
    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self {
            base_url: settings.comfyui_url.trim_end_matches('/').to_string(),
            workflow_template: settings.workflow_template.clone(),
            script_node_id: settings.script_node_id.clone(),
            speech_api_url: settings.speech_api_url.clone(),
            http: build_backend_http_client(),
        }
    }

    /// Submit one render job with `script` as the spoken text.
    /// Returns the backend-minted job id.
    pub async fn submit(&self, script: &str) -> Result<String> {
        let workflow = self.load_workflow(script).await?;
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": CLIENT_ID,
        });

        let response = self
            .http
            .post(format!("{}/prompt", self.base_url))
            .json(&body)
            .send()
            .await
            .context("failed to reach the video synthesis backend")?
            .error_for_status()
            .context("video synthesis backend rejected the workflow")?;
        let value: Value = response
            .json()
            .await
            .context("invalid response from the video synthesis backend")?;

        // The id key varies across renderer builds.
        for key in ["prompt_id", "job_id", "id"] {
            if let Some(id) = value.get(key).and_then(Value::as_str)
                && !id.is_empty()
            {
                tracing::info!(job_id = %id, "video synthesis job submitted");
                return Ok(id.to_string());
            }
        }
        bail!("submission accepted but the response carried no job id: {value}");
    }

    /// Download a rendered video file.
    pub async fn download(&self, artifact: &VideoArtifact) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{}/view", self.base_url))
            .query(&[
                ("filename", artifact.filename.as_str()),
                ("subfolder", artifact.subfolder.as_str()),
                ("type", artifact.folder_type.as_str()),
            ])
            .send()
            .await
            .context("failed to reach the video synthesis backend")?
            .error_for_status()
            .context("video download was rejected")?;
        let bytes = response
            .bytes()
            .await
            .context("video download was interrupted")?;
        Ok(bytes.to_vec())
    }

    async fn load_workflow(&self, script: &str) -> Result<Value> {
        let template = tokio::fs::read_to_string(&self.workflow_template)
            .await
            .with_context(|| {
                format!(
                    "failed to read workflow template {}",
                    self.workflow_template.display()
                )
            })?;
        let template = template.replace("${SPEECH_API_URL}", &self.speech_api_url);
        let mut workflow: Value =
            serde_json::from_str(&template).context("workflow template is not valid JSON")?;

        match workflow
            .get_mut(&self.script_node_id)
            .and_then(|node| node.get_mut("inputs"))
        {
            Some(inputs) => {
                inputs["text"] = Value::String(script.to_string());
            }
            None => {
                tracing::warn!(
                    node = %self.script_node_id,
                    "workflow template has no script text node; submitting unmodified"
                );
            }
        }
        Ok(workflow)
    }

    async fn history_entry(&self, job_id: &str) -> Result<Option<Value>> {
        let response = self
            .http
            .get(format!("{}/history/{job_id}", self.base_url))
            .send()
            .await
            .context("failed to reach the video synthesis backend")?
            .error_for_status()
            .context("history lookup failed")?;
        let value: Value = response
            .json()
            .await
            .context("invalid history response")?;
        Ok(value.get(job_id).cloned())
    }

    async fn queue_contains(&self, job_id: &str) -> Result<bool> {
        let response = self
            .http
            .get(format!("{}/queue", self.base_url))
            .send()
            .await
            .context("failed to reach the video synthesis backend")?
            .error_for_status()
            .context("queue lookup failed")?;
        let value: Value = response.json().await.context("invalid queue response")?;
        Ok(queue_lists_job(&value, job_id))
    }
}

#[async_trait]
impl JobProbe for ComfyUiClient {
    fn kind(&self) -> JobKind {
        JobKind::VideoGeneration
    }

    async fn probe(&self, job_id: &str) -> Result<JobStatus> {
        if let Some(entry) = self.history_entry(job_id).await? {
            if let Some(artifact) = extract_video_artifact(&entry) {
                return Ok(JobStatus::Completed(CompletedPayload::Video(artifact)));
            }
            if let Some(reason) = history_error_reason(&entry) {
                return Ok(JobStatus::Failed { reason });
            }
            // History entry without outputs: the renderer is still flushing.
            return Ok(JobStatus::Processing { detail: None });
        }
        if self.queue_contains(job_id).await? {
            return Ok(JobStatus::Processing { detail: None });
        }
        Ok(JobStatus::NotFound)
    }
}

/// Find the first rendered video in a finished history entry.
///
/// Renderers report videos under `gifs` or `videos` depending on the output
/// node; only the first file matters.
fn extract_video_artifact(entry: &Value) -> Option<VideoArtifact> {
    let outputs = entry.get("outputs")?.as_object()?;
    for node_output in outputs.values() {
        for key in ["gifs", "videos"] {
            let Some(videos) = node_output.get(key).and_then(Value::as_array) else {
                continue;
            };
            if let Some(video) = videos.first() {
                return Some(VideoArtifact {
                    filename: string_field(video, "filename"),
                    subfolder: string_field(video, "subfolder"),
                    folder_type: video
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("output")
                        .to_string(),
                });
            }
        }
    }
    None
}

fn history_error_reason(entry: &Value) -> Option<String> {
    let status = entry.get("status")?;
    let status_str = status.get("status_str").and_then(Value::as_str)?;
    if status_str != "error" {
        return None;
    }
    // Dig the exception message out of the status event log when present.
    if let Some(messages) = status.get("messages").and_then(Value::as_array) {
        for message in messages {
            let Some(parts) = message.as_array() else {
                continue;
            };
            if parts.first().and_then(Value::as_str) == Some("execution_error")
                && let Some(detail) = parts
                    .get(1)
                    .and_then(|data| data.get("exception_message"))
                    .and_then(Value::as_str)
            {
                return Some(detail.to_string());
            }
        }
    }
    Some("the renderer reported an execution error".to_string())
}

fn queue_lists_job(queue: &Value, job_id: &str) -> bool {
    for key in ["queue_running", "queue_pending"] {
        let Some(entries) = queue.get(key).and_then(Value::as_array) else {
            continue;
        };
        // Queue entries are arrays with the prompt id at index 1.
        let listed = entries
            .iter()
            .any(|entry| entry.get(1).and_then(Value::as_str) == Some(job_id));
        if listed {
            return true;
        }
    }
    false
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
