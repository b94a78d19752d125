//! LINE Messaging API adapter: push and reply-token delivery.

mod client;
mod constants;
mod error;
mod send;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::jobs::DeliverableContent;

use super::DeliveryChannel;
use client::build_line_http_client;
use constants::LINE_DEFAULT_API_BASE;

const PUSH_PATH: &str = "/v2/bot/message/push";
const REPLY_PATH: &str = "/v2/bot/message/reply";

/// Messaging API client for one bot channel.
pub struct LineChannel {
    pub(super) api_base: String,
    pub(super) access_token: String,
    pub(super) http: reqwest::Client,
}

impl LineChannel {
    /// Build a channel for `access_token`; `api_base` falls back to the
    /// public endpoint when empty.
    pub fn new(api_base: &str, access_token: &str) -> Self {
        let api_base = if api_base.trim().is_empty() {
            LINE_DEFAULT_API_BASE.to_string()
        } else {
            api_base.trim_end_matches('/').to_string()
        };
        Self {
            api_base,
            access_token: access_token.to_string(),
            http: build_line_http_client(),
        }
    }
}

#[async_trait]
impl DeliveryChannel for LineChannel {
    fn name(&self) -> &str {
        "line"
    }

    async fn push(&self, user_id: &str, content: &DeliverableContent) -> Result<()> {
        let body = serde_json::json!({
            "to": user_id,
            "messages": Self::messages_for(content),
        });
        self.send_api_request_with_retry(PUSH_PATH, &body)
            .await
            .map_err(|error| anyhow!("LINE push failed: {error}"))
    }

    async fn reply(&self, reply_token: &str, content: &DeliverableContent) -> Result<()> {
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": Self::messages_for(content),
        });
        self.send_api_request_with_retry(REPLY_PATH, &body)
            .await
            .map_err(|error| anyhow!("LINE reply failed: {error}"))
    }
}
