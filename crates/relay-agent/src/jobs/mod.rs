//! Asynchronous job monitoring and exactly-once result delivery.
//!
//! Control flow: submission → registry entry → detached monitor task →
//! router polls the backends → materializer prepares the result → channel
//! push → registry entry removed. The synchronous query path races the
//! monitor for the same completion; the registry's delivery claim keeps
//! delivery exactly-once.

mod materializer;
mod monitor;
mod query;
mod registry;
mod router;
mod service;
mod types;

pub use materializer::{ArtifactFetcher, MaterializeError, Materializer};
pub use query::QueryOutcome;
pub use registry::{JobRegistry, RegistryMetrics};
pub use router::{JobProbe, ProbeRouter, ResolvedStatus};
pub use service::JobService;
pub use types::{
    CompletedPayload, DeliverableContent, JobKind, JobStatus, MonitorConfig, MonitorRecord,
    NewJob, StatusKind, VideoArtifact,
};
