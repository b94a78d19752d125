use std::time::Duration;

use reqwest::StatusCode;

use super::constants::{
    LINE_MAX_RATE_LIMIT_RETRY_SECS, LINE_SEND_RETRY_BASE_MS, LINE_SEND_RETRY_MAX_MS,
};

#[derive(Debug)]
pub(super) struct LineApiError {
    pub(super) status: Option<StatusCode>,
    pub(super) retry_after_secs: Option<u64>,
    pub(super) body: String,
}

impl LineApiError {
    pub(super) fn from_reqwest(err: reqwest::Error) -> Self {
        let body = if err.is_timeout() {
            format!("timed out: {err}")
        } else {
            err.to_string()
        };
        Self {
            status: None,
            retry_after_secs: None,
            body,
        }
    }

    pub(super) fn should_retry_send(&self) -> bool {
        match self.status {
            Some(status) => {
                status == StatusCode::TOO_MANY_REQUESTS
                    || status == StatusCode::REQUEST_TIMEOUT
                    || status.is_server_error()
            }
            // No status means the request never completed (transport error).
            None => true,
        }
    }

    pub(super) fn retry_delay(&self, attempt: usize) -> Duration {
        if let Some(retry_after_secs) = self.retry_after_secs {
            return Duration::from_secs(retry_after_secs.min(LINE_MAX_RATE_LIMIT_RETRY_SECS));
        }
        let shift = attempt.min(10) as u32;
        let backoff_ms = LINE_SEND_RETRY_BASE_MS
            .saturating_mul(1_u64 << shift)
            .min(LINE_SEND_RETRY_MAX_MS);
        Duration::from_millis(backoff_ms)
    }
}

impl std::fmt::Display for LineApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, self.retry_after_secs) {
            (Some(status), Some(retry_after_secs)) => write!(
                f,
                "status={status}, retry_after={retry_after_secs}s, body={}",
                self.body
            ),
            (Some(status), None) => write!(f, "status={status}, body={}", self.body),
            (None, Some(retry_after_secs)) => write!(
                f,
                "retry_after={retry_after_secs}s, body={}",
                self.body
            ),
            (None, None) => write!(f, "body={}", self.body),
        }
    }
}
