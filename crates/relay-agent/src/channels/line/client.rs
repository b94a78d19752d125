use std::time::Duration;

use super::constants::{LINE_HTTP_CONNECT_TIMEOUT_SECS, LINE_HTTP_REQUEST_TIMEOUT_SECS};

pub(super) fn build_line_http_client() -> reqwest::Client {
    match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(LINE_HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(LINE_HTTP_REQUEST_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            tracing::warn!(
                error = %error,
                "Failed to build LINE HTTP client with timeouts; falling back to default client"
            );
            reqwest::Client::new()
        }
    }
}
