//! Process-wide registry of active job monitors.
//!
//! The registry owns the only shared mutable state in the monitoring core: the
//! `job_id -> MonitorRecord` map and the `user_id -> job ids` index. Every
//! check-then-act sequence (`try_register`, `claim_delivery`, `remove`) runs
//! under one lock so the invariants hold on a multi-threaded runtime instead
//! of leaning on cooperative scheduling.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tokio::sync::Mutex;

use super::types::{JobKind, MonitorRecord, NewJob, StatusKind};

#[derive(Default)]
struct RegistryInner {
    records: HashMap<String, MonitorRecord>,
    user_jobs: HashMap<String, HashSet<String>>,
}

/// Mutex-guarded map of active monitors plus the per-user job index.
#[derive(Default)]
pub struct JobRegistry {
    inner: Mutex<RegistryInner>,
}

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryMetrics {
    /// Monitors currently tracked.
    pub active_jobs: usize,
    /// Active monitors hinted as video generation.
    pub video_jobs: usize,
    /// Active monitors hinted as transcription.
    pub transcription_jobs: usize,
    /// Users with at least one active job.
    pub tracked_users: usize,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically create a record for `job` unless one already exists.
    ///
    /// Returns `false` when the job id is already being monitored; the caller
    /// must not spawn a second monitor in that case.
    pub async fn try_register(&self, job: &NewJob) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.records.contains_key(&job.job_id) {
            return false;
        }
        inner.records.insert(
            job.job_id.clone(),
            MonitorRecord {
                job_id: job.job_id.clone(),
                owner_user_id: job.owner_user_id.clone(),
                kind_hint: job.kind_hint,
                origin_url: job.origin_url.clone(),
                last_known_state: StatusKind::Processing,
                started_at: Instant::now(),
                delivery_claimed: false,
            },
        );
        inner
            .user_jobs
            .entry(job.owner_user_id.clone())
            .or_default()
            .insert(job.job_id.clone());
        true
    }

    /// Whether a record for `job_id` still exists.
    pub async fn contains(&self, job_id: &str) -> bool {
        self.inner.lock().await.records.contains_key(job_id)
    }

    /// Record the latest state a poll observed.
    pub async fn note_state(&self, job_id: &str, state: StatusKind) {
        if let Some(record) = self.inner.lock().await.records.get_mut(job_id) {
            record.last_known_state = state;
        }
    }

    /// Atomically claim the right to materialize + deliver a completion.
    ///
    /// The first caller (background monitor or synchronous query path) wins;
    /// everyone else gets `false` and must not deliver. This is the explicit
    /// linearization point for exactly-once delivery.
    pub async fn claim_delivery(&self, job_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.records.get_mut(job_id) {
            Some(record) if !record.delivery_claimed => {
                record.delivery_claimed = true;
                true
            }
            _ => false,
        }
    }

    /// Remove the record and its user-index entry, returning the record.
    pub async fn remove(&self, job_id: &str) -> Option<MonitorRecord> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.remove(job_id)?;
        if let Some(jobs) = inner.user_jobs.get_mut(&record.owner_user_id) {
            jobs.remove(job_id);
            if jobs.is_empty() {
                inner.user_jobs.remove(&record.owner_user_id);
            }
        }
        Some(record)
    }

    /// Snapshot of one record, if present.
    pub async fn get(&self, job_id: &str) -> Option<MonitorRecord> {
        self.inner.lock().await.records.get(job_id).cloned()
    }

    /// Active job ids for one user.
    pub async fn jobs_for_user(&self, user_id: &str) -> Vec<String> {
        let inner = self.inner.lock().await;
        let Some(jobs) = inner.user_jobs.get(user_id) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = jobs.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Aggregate counts for the health endpoint.
    pub async fn metrics(&self) -> RegistryMetrics {
        let inner = self.inner.lock().await;
        let mut video_jobs = 0;
        let mut transcription_jobs = 0;
        for record in inner.records.values() {
            match record.kind_hint {
                Some(JobKind::VideoGeneration) => video_jobs += 1,
                Some(JobKind::Transcription) => transcription_jobs += 1,
                None => {}
            }
        }
        RegistryMetrics {
            active_jobs: inner.records.len(),
            video_jobs,
            transcription_jobs,
            tracked_users: inner.user_jobs.len(),
        }
    }
}
