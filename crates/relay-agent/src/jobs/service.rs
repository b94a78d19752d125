//! Aggregates the monitoring core behind one service handle.

use std::sync::Arc;

use crate::channels::DeliveryChannel;

use super::materializer::Materializer;
use super::registry::JobRegistry;
use super::router::ProbeRouter;
use super::types::{MonitorConfig, NewJob};

/// One handle over the registry, router, materializer and delivery channel.
///
/// `start_monitor` is the only entry point into the subsystem: the submission
/// call site creates the job record and hands it here. Monitors are detached
/// tasks with no persistence; monitors in flight when the process exits are
/// lost, which is an accepted operational limitation.
pub struct JobService {
    pub(super) registry: Arc<JobRegistry>,
    pub(super) router: Arc<ProbeRouter>,
    pub(super) materializer: Arc<Materializer>,
    pub(super) channel: Arc<dyn DeliveryChannel>,
    pub(super) config: MonitorConfig,
}

impl JobService {
    /// Wire up the service; budgets are clamped to workable minimums.
    pub fn new(
        registry: Arc<JobRegistry>,
        router: Arc<ProbeRouter>,
        materializer: Arc<Materializer>,
        channel: Arc<dyn DeliveryChannel>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            registry,
            router,
            materializer,
            channel,
            config: config.normalized(),
        }
    }

    /// Registry handle for health reporting and tests.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Register `job` and spawn its background monitor.
    ///
    /// Returns `false` (and spawns nothing) when the job id is already being
    /// monitored; the registry create-check is atomic, so at most one
    /// monitor ever exists per job id.
    pub async fn start_monitor(self: &Arc<Self>, job: NewJob) -> bool {
        if !self.registry.try_register(&job).await {
            tracing::warn!(
                job_id = %job.job_id,
                owner = %job.owner_user_id,
                "job is already being monitored; not spawning a second monitor"
            );
            return false;
        }
        if let Some(kind) = job.kind_hint {
            self.router.seed(&job.job_id, kind).await;
        }

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run_monitor(job).await;
        });
        true
    }

    pub(super) async fn finish_terminal(&self, job_id: &str) {
        self.registry.remove(job_id).await;
        self.router.forget(job_id).await;
    }
}
