//! Shared types for the job monitoring core.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Kind of external backend a job runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// AI video synthesis (workflow renderer).
    VideoGeneration,
    /// Video transcription + summarization.
    Transcription,
}

impl JobKind {
    /// Stable label for logs and health output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::VideoGeneration => "video_generation",
            Self::Transcription => "transcription",
        }
    }
}

/// Reference to a rendered video file on the synthesis backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoArtifact {
    /// File name reported by the backend.
    pub filename: String,
    /// Subfolder under the backend's output root.
    pub subfolder: String,
    /// Backend folder type (usually `output`).
    pub folder_type: String,
}

/// Payload carried by a `Completed` probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedPayload {
    /// A rendered video waiting to be downloaded.
    Video(VideoArtifact),
    /// A transcription summary; may be a preview the materializer upgrades.
    Summary {
        /// Summary text as reported by the status endpoint.
        text: String,
    },
}

/// Result of probing one backend for one job id.
///
/// Never persisted; recomputed on every probe. `NotFound` means "this backend
/// has no record of the id", which is how the router tells "wrong backend"
/// apart from a real error (those surface as `Err` from the probe call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// The backend does not know this job id.
    NotFound,
    /// The job is queued or running.
    Processing {
        /// Optional human-readable progress detail.
        detail: Option<String>,
    },
    /// The job finished and produced a payload.
    Completed(CompletedPayload),
    /// The backend reports the job itself failed.
    Failed {
        /// Backend-reported failure reason.
        reason: String,
    },
}

impl JobStatus {
    /// Collapse to the state label stored on the monitor record.
    pub const fn kind(&self) -> StatusKind {
        match self {
            Self::NotFound => StatusKind::NotFound,
            Self::Processing { .. } => StatusKind::Processing,
            Self::Completed(_) => StatusKind::Completed,
            Self::Failed { .. } => StatusKind::Failed,
        }
    }
}

/// Payload-free state label, used for registry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Unknown to the probed backend.
    NotFound,
    /// Queued or running.
    Processing,
    /// Finished with a payload.
    Completed,
    /// Failed on the backend.
    Failed,
}

/// Submission ticket handed to `JobService::start_monitor`.
///
/// Created by the call site that submitted the job to the external backend;
/// immutable after creation.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Backend-minted job id.
    pub job_id: String,
    /// User the result must be delivered to.
    pub owner_user_id: String,
    /// Best-effort kind known at submission time; probing does not trust it.
    pub kind_hint: Option<JobKind>,
    /// Source URL for transcription jobs, if any.
    pub origin_url: Option<String>,
}

/// Bookkeeping for one active monitor. Lives in the [`super::JobRegistry`];
/// created when a monitor starts, deleted on terminal state or timeout.
#[derive(Debug, Clone)]
pub struct MonitorRecord {
    /// Backend-minted job id.
    pub job_id: String,
    /// User the result must be delivered to.
    pub owner_user_id: String,
    /// Best-effort kind known at submission time.
    pub kind_hint: Option<JobKind>,
    /// Source URL for transcription jobs, if any.
    pub origin_url: Option<String>,
    /// Last state observed by the monitor.
    pub last_known_state: StatusKind,
    /// When the monitor started.
    pub started_at: Instant,
    pub(super) delivery_claimed: bool,
}

/// Content ready for delivery over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliverableContent {
    /// Plain text (summaries, status reports).
    Text(String),
    /// A video served from this process's public media endpoint.
    Video {
        /// Public URL of the materialized video file.
        url: String,
        /// Public URL of the still preview image.
        preview_url: String,
    },
}

/// Timing and budget knobs for the monitor, router and query path.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Grace period before the first probe, so the backend can register the job.
    pub initial_delay: Duration,
    /// Fixed sleep between polls.
    pub poll_interval: Duration,
    /// Poll budget before the monitor gives up silently.
    pub max_attempts: u32,
    /// Per-probe timeout inside the router fan-out.
    pub probe_timeout: Duration,
    /// Extra re-probes the synchronous query path performs while `Processing`.
    pub smart_wait_probes: u32,
    /// Sleep between smart-wait re-probes.
    pub smart_wait_interval: Duration,
    /// Fetch retries the materializer performs before giving up.
    pub materialize_retries: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            max_attempts: 120,
            probe_timeout: Duration::from_secs(10),
            smart_wait_probes: 5,
            smart_wait_interval: Duration::from_secs(1),
            materialize_retries: 2,
        }
    }
}

impl MonitorConfig {
    /// Clamp budgets to workable minimums.
    pub fn normalized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self.poll_interval = self.poll_interval.max(Duration::from_millis(10));
        self.probe_timeout = self.probe_timeout.max(Duration::from_millis(10));
        self.smart_wait_interval = self.smart_wait_interval.max(Duration::from_millis(10));
        self
    }
}

pub(super) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let mut iter = text.chars();
    let truncated: String = iter.by_ref().take(max_chars).collect();
    if iter.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
