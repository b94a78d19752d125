use crate::jobs::DeliverableContent;

use super::LineChannel;
use super::constants::{LINE_MAX_TEXT_LENGTH, LINE_SEND_MAX_RETRIES};
use super::error::LineApiError;

impl LineChannel {
    pub(super) fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Build the platform message array for one piece of content.
    pub(super) fn messages_for(content: &DeliverableContent) -> Vec<serde_json::Value> {
        match content {
            DeliverableContent::Text(text) => vec![serde_json::json!({
                "type": "text",
                "text": truncate_text(text, LINE_MAX_TEXT_LENGTH),
            })],
            DeliverableContent::Video { url, preview_url } => vec![serde_json::json!({
                "type": "video",
                "originalContentUrl": url,
                "previewImageUrl": preview_url,
            })],
        }
    }

    pub(super) async fn send_api_request_with_retry(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), LineApiError> {
        for attempt in 0..=LINE_SEND_MAX_RETRIES {
            match self.send_once(path, body).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < LINE_SEND_MAX_RETRIES && error.should_retry_send() => {
                    let delay = error.retry_delay(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries = LINE_SEND_MAX_RETRIES,
                        delay_ms = delay.as_millis(),
                        path,
                        error = %error,
                        "LINE send transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }

        unreachable!("send_api_request_with_retry should return before exhausting attempts")
    }

    async fn send_once(&self, path: &str, body: &serde_json::Value) -> Result<(), LineApiError> {
        let response = self
            .http
            .post(self.api_url(path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(LineApiError::from_reqwest)?;
        Self::validate_line_response(response).await
    }

    async fn validate_line_response(response: reqwest::Response) -> Result<(), LineApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(LineApiError {
            status: Some(status),
            retry_after_secs,
            body: truncate_text(&body, 500),
        })
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    let mut iter = text.chars();
    let truncated: String = iter.by_ref().take(max_chars).collect();
    if iter.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
