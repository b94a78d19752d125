//! Probe fan-out: resolve a job id against every known backend at once.
//!
//! Job kind is not tracked reliably at submission time on all call paths, so
//! the router resolves by elimination: ask every backend concurrently and take
//! the first definitive (non-`NotFound`) answer. Job ids are namespaced per
//! backend in practice, so two definitive answers for one id are not expected;
//! if that assumption ever breaks, whichever probe completes first wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::types::{JobKind, JobStatus};

/// Read-only status check against one backend.
///
/// Implementations must return `JobStatus::NotFound` (not an error) when the
/// backend has no record of the id; errors are reserved for transport
/// failures, which the router degrades to "no answer from this backend".
#[async_trait]
pub trait JobProbe: Send + Sync {
    /// Backend kind this probe speaks for.
    fn kind(&self) -> JobKind;

    /// Probe the backend for the current status of `job_id`.
    async fn probe(&self, job_id: &str) -> Result<JobStatus>;
}

/// A definitive answer from one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStatus {
    /// Which backend answered.
    pub kind: JobKind,
    /// The status it reported (never `NotFound`).
    pub status: JobStatus,
}

/// Races all probes for a job id and remembers which backend answered.
pub struct ProbeRouter {
    probes: Vec<Arc<dyn JobProbe>>,
    probe_timeout: Duration,
    kind_cache: Mutex<HashMap<String, JobKind>>,
}

impl ProbeRouter {
    /// Build a router over the given probes with a per-probe timeout.
    pub fn new(probes: Vec<Arc<dyn JobProbe>>, probe_timeout: Duration) -> Self {
        Self {
            probes,
            probe_timeout,
            kind_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-seed the backend association for a job (submission-time hint).
    ///
    /// A wrong hint is harmless: a `NotFound` from the cached backend evicts
    /// the entry and falls back to the full fan-out.
    pub async fn seed(&self, job_id: &str, kind: JobKind) {
        self.kind_cache
            .lock()
            .await
            .insert(job_id.to_string(), kind);
    }

    /// Drop the cached backend association for a terminal job.
    pub async fn forget(&self, job_id: &str) {
        self.kind_cache.lock().await.remove(job_id);
    }

    /// Resolve the current status of `job_id`, or `None` when every backend
    /// disclaims it (all `NotFound`, errored, or timed out).
    pub async fn resolve(&self, job_id: &str) -> Option<ResolvedStatus> {
        if let Some(kind) = self.cached_kind(job_id).await
            && let Some(probe) = self.probe_for(kind)
        {
            match tokio::time::timeout(self.probe_timeout, probe.probe(job_id)).await {
                Ok(Ok(JobStatus::NotFound)) => {
                    tracing::debug!(
                        %job_id,
                        kind = kind.label(),
                        "cached backend no longer knows the job; re-probing everywhere"
                    );
                    self.forget(job_id).await;
                }
                Ok(Ok(status)) => return Some(ResolvedStatus { kind, status }),
                Ok(Err(error)) => {
                    tracing::debug!(
                        %job_id,
                        kind = kind.label(),
                        error = %error,
                        "cached backend probe failed; re-probing everywhere"
                    );
                    self.forget(job_id).await;
                }
                Err(_) => {
                    tracing::debug!(
                        %job_id,
                        kind = kind.label(),
                        "cached backend probe timed out; re-probing everywhere"
                    );
                    self.forget(job_id).await;
                }
            }
        }

        self.resolve_by_elimination(job_id).await
    }

    async fn resolve_by_elimination(&self, job_id: &str) -> Option<ResolvedStatus> {
        if self.probes.is_empty() {
            return None;
        }

        let (tx, mut rx) = mpsc::channel::<Option<ResolvedStatus>>(self.probes.len());
        for probe in &self.probes {
            let probe = Arc::clone(probe);
            let tx = tx.clone();
            let job_id = job_id.to_string();
            let probe_timeout = self.probe_timeout;
            tokio::spawn(async move {
                let outcome = match tokio::time::timeout(probe_timeout, probe.probe(&job_id)).await
                {
                    Ok(Ok(JobStatus::NotFound)) => None,
                    Ok(Ok(status)) => Some(ResolvedStatus {
                        kind: probe.kind(),
                        status,
                    }),
                    Ok(Err(error)) => {
                        tracing::debug!(
                            %job_id,
                            kind = probe.kind().label(),
                            error = %error,
                            "probe failed"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::debug!(
                            %job_id,
                            kind = probe.kind().label(),
                            timeout_ms = probe_timeout.as_millis(),
                            "probe timed out"
                        );
                        None
                    }
                };
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        // First definitive answer wins; None answers just drain.
        while let Some(outcome) = rx.recv().await {
            if let Some(resolved) = outcome {
                self.kind_cache
                    .lock()
                    .await
                    .insert(job_id.to_string(), resolved.kind);
                return Some(resolved);
            }
        }
        None
    }

    async fn cached_kind(&self, job_id: &str) -> Option<JobKind> {
        self.kind_cache.lock().await.get(job_id).copied()
    }

    fn probe_for(&self, kind: JobKind) -> Option<&Arc<dyn JobProbe>> {
        self.probes.iter().find(|probe| probe.kind() == kind)
    }
}
