//! Delivery channel trait and adapters for chat platforms.

mod line;

use anyhow::Result;
use async_trait::async_trait;

use crate::jobs::DeliverableContent;

pub use line::LineChannel;

/// Outbound side of a messaging platform.
///
/// `push` must stay callable long after the webhook request that triggered
/// the job has returned; the background monitor delivers minutes later.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Human-readable channel name for logs.
    fn name(&self) -> &str;

    /// Push `content` to a user out of band.
    async fn push(&self, user_id: &str, content: &DeliverableContent) -> Result<()>;

    /// Answer the request identified by `reply_token` with `content`.
    async fn reply(&self, reply_token: &str, content: &DeliverableContent) -> Result<()>;
}
