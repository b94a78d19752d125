pub(super) const LINE_DEFAULT_API_BASE: &str = "https://api.line.me";
pub(super) const LINE_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub(super) const LINE_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub(super) const LINE_SEND_MAX_RETRIES: usize = 2;
pub(super) const LINE_SEND_RETRY_BASE_MS: u64 = 200;
pub(super) const LINE_SEND_RETRY_MAX_MS: u64 = 2_000;
pub(super) const LINE_MAX_RATE_LIMIT_RETRY_SECS: u64 = 60;

/// LINE's maximum text message length.
pub(super) const LINE_MAX_TEXT_LENGTH: usize = 5_000;
