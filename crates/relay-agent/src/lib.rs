//! Chat-bot backend core that tracks long-running media jobs (AI video
//! synthesis, video transcription) and relays results to the submitting user.
//!
//! Two delivery paths race per job: a detached background monitor pushes the
//! result when it observes completion, and the synchronous query path replies
//! inline when the user asks first. The job registry's delivery claim keeps
//! delivery exactly-once across both.

#![allow(missing_docs)]

mod backends;
mod channels;
mod config;
mod gateway;
mod jobs;
#[doc(hidden)]
pub mod test_support;

pub use backends::{BackendArtifacts, ComfyUiClient, TranscriberClient};
pub use channels::{DeliveryChannel, LineChannel};
pub use config::{
    BackendSettings, GatewaySettings, LineSettings, MediaSettings, MonitorSettings,
    RuntimeSettings, load_runtime_settings,
};
pub use gateway::{GatewayHealthResponse, GatewayState, router, run_http};
pub use jobs::{
    ArtifactFetcher, CompletedPayload, DeliverableContent, JobKind, JobProbe, JobRegistry,
    JobService, JobStatus, MaterializeError, Materializer, MonitorConfig, MonitorRecord, NewJob,
    ProbeRouter, QueryOutcome, RegistryMetrics, ResolvedStatus, StatusKind, VideoArtifact,
};
