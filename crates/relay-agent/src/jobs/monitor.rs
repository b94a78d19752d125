//! Background poll loop: one detached task per submitted job.

use super::service::JobService;
use super::types::{
    CompletedPayload, DeliverableContent, JobKind, JobStatus, NewJob, StatusKind, truncate_for_log,
};

impl JobService {
    /// Poll `job` to a terminal state and deliver the result via push.
    ///
    /// State machine: grace sleep, then poll the router once per interval
    /// until a terminal status is observed or the attempt budget runs out.
    /// Failure and timeout clean up silently: the background path never
    /// notifies the user except on success, so transient backend hiccups do
    /// not turn into false alarms.
    pub(super) async fn run_monitor(&self, job: NewJob) {
        tracing::info!(
            job_id = %job.job_id,
            owner = %job.owner_user_id,
            kind_hint = job.kind_hint.map(JobKind::label),
            "starting background job monitor"
        );

        // Grace period so the backend can register the job before the first
        // probe; avoids a spurious NotFound right after submission.
        tokio::time::sleep(self.config.initial_delay).await;

        let mut attempts: u32 = 0;
        while attempts < self.config.max_attempts {
            tokio::time::sleep(self.config.poll_interval).await;
            attempts += 1;

            if !self.registry.contains(&job.job_id).await {
                tracing::debug!(
                    job_id = %job.job_id,
                    "monitor record gone; the query path finished this job"
                );
                return;
            }

            match self.router.resolve(&job.job_id).await {
                None => {
                    // Not visible on any backend yet, or every probe errored
                    // out this round; the attempt budget bounds the retries.
                    tracing::trace!(job_id = %job.job_id, attempts, "job not resolved this poll");
                }
                Some(resolved) => match resolved.status {
                    JobStatus::Processing { detail } => {
                        self.registry
                            .note_state(&job.job_id, StatusKind::Processing)
                            .await;
                        tracing::trace!(
                            job_id = %job.job_id,
                            attempts,
                            detail = detail.as_deref().unwrap_or_default(),
                            "job still processing"
                        );
                    }
                    JobStatus::Completed(payload) => {
                        self.deliver_completed(&job, resolved.kind, &payload).await;
                        return;
                    }
                    JobStatus::Failed { reason } => {
                        tracing::warn!(
                            job_id = %job.job_id,
                            kind = resolved.kind.label(),
                            %reason,
                            "background job failed; cleaning up without notifying the user"
                        );
                        self.registry
                            .note_state(&job.job_id, StatusKind::Failed)
                            .await;
                        self.finish_terminal(&job.job_id).await;
                        return;
                    }
                    // The router never surfaces NotFound as a definitive answer.
                    JobStatus::NotFound => {}
                },
            }
        }

        tracing::warn!(
            job_id = %job.job_id,
            max_attempts = self.config.max_attempts,
            "monitor exhausted its attempt budget while the job was still pending; giving up"
        );
        self.finish_terminal(&job.job_id).await;
    }

    /// Materialize and push one completion, exactly once across the monitor
    /// and the synchronous query path.
    ///
    /// The record is removed only after the delivery attempt (success or
    /// caught failure): a crash mid-delivery drops the notification instead
    /// of risking a double send.
    async fn deliver_completed(&self, job: &NewJob, kind: JobKind, payload: &CompletedPayload) {
        if !self.registry.claim_delivery(&job.job_id).await {
            tracing::debug!(
                job_id = %job.job_id,
                "completion already claimed by the query path; monitor stands down"
            );
            return;
        }
        self.registry
            .note_state(&job.job_id, StatusKind::Completed)
            .await;

        match self.materializer.materialize(&job.job_id, payload).await {
            Ok(content) => {
                let content = push_content(&job.job_id, &content);
                match self.channel.push(&job.owner_user_id, &content).await {
                    Ok(()) => {
                        tracing::info!(
                            job_id = %job.job_id,
                            owner = %job.owner_user_id,
                            kind = kind.label(),
                            "job result pushed to user"
                        );
                    }
                    Err(error) => {
                        tracing::error!(
                            job_id = %job.job_id,
                            owner = %job.owner_user_id,
                            error = %error,
                            "push failed; completion notification dropped"
                        );
                    }
                }
            }
            Err(error) => {
                tracing::error!(
                    job_id = %job.job_id,
                    error = %error,
                    "materialization failed; completion notification dropped"
                );
            }
        }

        self.finish_terminal(&job.job_id).await;
    }
}

/// Wrap materialized content for an unsolicited push.
fn push_content(job_id: &str, content: &DeliverableContent) -> DeliverableContent {
    match content {
        DeliverableContent::Text(text) => {
            tracing::debug!(%job_id, preview = %truncate_for_log(text, 80), "pushing summary text");
            DeliverableContent::Text(format!("Job {job_id} finished.\n\n{text}"))
        }
        video @ DeliverableContent::Video { .. } => video.clone(),
    }
}
