//! Test-only doubles for the monitoring core's trait seams.
//!
//! Integration tests script probe answers, record channel deliveries, and
//! count artifact fetches without touching any real backend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::channels::DeliveryChannel;
use crate::jobs::{
    ArtifactFetcher, DeliverableContent, JobKind, JobProbe, JobStatus, VideoArtifact,
};

/// One scripted probe answer.
#[derive(Debug, Clone)]
pub enum ProbeResponse {
    /// Return this status.
    Status(JobStatus),
    /// Fail with a transport-style error.
    Error(String),
    /// Never answer; the router's per-probe timeout has to fire.
    Hang,
}

/// Probe double that pops one scripted response per call and repeats the
/// last one forever.
pub struct MockProbe {
    kind: JobKind,
    script: Mutex<VecDeque<ProbeResponse>>,
    calls: AtomicUsize,
}

impl MockProbe {
    /// Script a sequence of responses.
    pub fn new(kind: JobKind, responses: Vec<ProbeResponse>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always answer with the same status.
    pub fn always(kind: JobKind, status: JobStatus) -> Arc<Self> {
        Self::new(kind, vec![ProbeResponse::Status(status)])
    }

    /// Always answer `NotFound`.
    pub fn never_found(kind: JobKind) -> Arc<Self> {
        Self::always(kind, JobStatus::NotFound)
    }

    /// How many times the probe was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobProbe for MockProbe {
    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn probe(&self, _job_id: &str) -> Result<JobStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = {
            let mut script = self.script.lock().await;
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        match response {
            Some(ProbeResponse::Status(status)) => Ok(status),
            Some(ProbeResponse::Error(message)) => Err(anyhow!(message)),
            Some(ProbeResponse::Hang) => {
                std::future::pending::<()>().await;
                unreachable!("pending future never resolves")
            }
            None => Ok(JobStatus::NotFound),
        }
    }
}

/// One recorded channel send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Out-of-band push to a user.
    Push {
        /// Target user.
        user_id: String,
        /// Delivered content.
        content: DeliverableContent,
    },
    /// Reply bound to a token.
    Reply {
        /// Reply token.
        reply_token: String,
        /// Delivered content.
        content: DeliverableContent,
    },
}

/// Channel double that records every send.
pub struct MockChannel {
    deliveries: mpsc::UnboundedSender<Delivery>,
    fail_sends: AtomicBool,
    pushes: AtomicUsize,
}

impl MockChannel {
    /// A channel whose sends succeed; the receiver yields every delivery.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                deliveries: tx,
                fail_sends: AtomicBool::new(false),
                pushes: AtomicUsize::new(0),
            }),
            rx,
        )
    }

    /// Make every subsequent send fail (after being recorded).
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// How many pushes were attempted.
    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryChannel for MockChannel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn push(&self, user_id: &str, content: &DeliverableContent) -> Result<()> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        let _ = self.deliveries.send(Delivery::Push {
            user_id: user_id.to_string(),
            content: content.clone(),
        });
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(anyhow!("mock channel configured to fail"));
        }
        Ok(())
    }

    async fn reply(&self, reply_token: &str, content: &DeliverableContent) -> Result<()> {
        let _ = self.deliveries.send(Delivery::Reply {
            reply_token: reply_token.to_string(),
            content: content.clone(),
        });
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(anyhow!("mock channel configured to fail"));
        }
        Ok(())
    }
}

/// Fetcher double with countable fetches and optional initial failures.
pub struct MockFetcher {
    video_bytes: Vec<u8>,
    video_failures_left: AtomicUsize,
    video_calls: AtomicUsize,
    summary: Option<String>,
    summary_calls: AtomicUsize,
}

impl MockFetcher {
    /// Serves `bytes` for every video fetch and no fuller summary.
    pub fn with_video(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            video_bytes: bytes,
            video_failures_left: AtomicUsize::new(0),
            video_calls: AtomicUsize::new(0),
            summary: None,
            summary_calls: AtomicUsize::new(0),
        })
    }

    /// Serves `bytes`, but the first `failures` fetches error out.
    pub fn with_flaky_video(bytes: Vec<u8>, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            video_bytes: bytes,
            video_failures_left: AtomicUsize::new(failures),
            video_calls: AtomicUsize::new(0),
            summary: None,
            summary_calls: AtomicUsize::new(0),
        })
    }

    /// Serves a full transcription result.
    pub fn with_summary(text: &str) -> Arc<Self> {
        Arc::new(Self {
            video_bytes: Vec::new(),
            video_failures_left: AtomicUsize::new(0),
            video_calls: AtomicUsize::new(0),
            summary: Some(text.to_string()),
            summary_calls: AtomicUsize::new(0),
        })
    }

    /// How many video fetches were attempted.
    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    /// How many summary fetches were attempted.
    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn fetch_video(&self, _artifact: &VideoArtifact) -> Result<Vec<u8>> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        let failures = self.video_failures_left.load(Ordering::SeqCst);
        if failures > 0 {
            self.video_failures_left.store(failures - 1, Ordering::SeqCst);
            return Err(anyhow!("mock video fetch failure"));
        }
        Ok(self.video_bytes.clone())
    }

    async fn fetch_summary(&self, _job_id: &str) -> Result<Option<String>> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.summary.clone())
    }
}
