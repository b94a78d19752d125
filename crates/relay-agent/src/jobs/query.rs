//! Synchronous status query with a bounded "smart wait".
//!
//! Serves an explicit "is it done?" request. Instead of answering
//! `Processing` immediately, the path re-probes a few times so a user who is
//! actively polling gets the finished result in the same request, delivered
//! over the low-latency reply path instead of a later push.

use super::service::JobService;
use super::types::{DeliverableContent, JobKind, JobStatus, StatusKind};

/// What the query path resolved for the caller to reply with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// No backend knows the id.
    NotFound,
    /// Still queued or running after the smart wait.
    Processing {
        /// Which backend is running the job.
        kind: JobKind,
        /// Optional progress detail from the backend.
        detail: Option<String>,
    },
    /// The backend reports the job failed, or materialization gave up.
    Failed {
        /// Which backend reported the failure.
        kind: JobKind,
        /// User-facing failure reason.
        reason: String,
    },
    /// Finished; content is materialized and ready for the reply.
    Completed {
        /// Which backend produced the result.
        kind: JobKind,
        /// Materialized content for the reply.
        content: DeliverableContent,
    },
    /// Finished, but the background monitor claimed delivery first.
    AlreadyDelivered {
        /// Which backend produced the result.
        kind: JobKind,
    },
}

impl JobService {
    /// Resolve the current status of `job_id` for an explicit user query.
    ///
    /// Probes once; while the answer is `Processing`, performs up to the
    /// configured number of one-interval waits and re-probes (the router's
    /// kind cache keeps the re-probes off the full fan-out). A completion
    /// observed here is claimed and materialized inline so the caller can
    /// deliver it via `reply`.
    pub async fn query_status(&self, job_id: &str, requesting_user_id: &str) -> QueryOutcome {
        tracing::info!(%job_id, user = %requesting_user_id, "synchronous status query");

        let Some(mut resolved) = self.router.resolve(job_id).await else {
            tracing::info!(%job_id, "job unknown to every backend");
            return QueryOutcome::NotFound;
        };

        if matches!(resolved.status, JobStatus::Processing { .. }) {
            let mut waits = 0;
            while waits < self.config.smart_wait_probes {
                tokio::time::sleep(self.config.smart_wait_interval).await;
                waits += 1;
                tracing::debug!(%job_id, waits, "smart wait re-probe");

                match self.router.resolve(job_id).await {
                    Some(update) => {
                        let done = !matches!(update.status, JobStatus::Processing { .. });
                        resolved = update;
                        if done {
                            tracing::info!(%job_id, waits, "job reached a terminal state during the smart wait");
                            break;
                        }
                    }
                    // The job vanished mid-wait; report the last known answer.
                    None => break,
                }
            }
        }

        match resolved.status {
            JobStatus::Processing { detail } => {
                self.registry.note_state(job_id, StatusKind::Processing).await;
                QueryOutcome::Processing {
                    kind: resolved.kind,
                    detail,
                }
            }
            JobStatus::Failed { reason } => {
                // The sync path surfaces the failure; the record (if any) is
                // cleaned up so the background monitor stops probing.
                if self.registry.contains(job_id).await {
                    self.finish_terminal(job_id).await;
                } else {
                    self.router.forget(job_id).await;
                }
                QueryOutcome::Failed {
                    kind: resolved.kind,
                    reason,
                }
            }
            JobStatus::Completed(payload) => {
                let registered = self.registry.contains(job_id).await;
                if registered && !self.registry.claim_delivery(job_id).await {
                    tracing::debug!(%job_id, "completion already claimed by the background monitor");
                    return QueryOutcome::AlreadyDelivered {
                        kind: resolved.kind,
                    };
                }

                let outcome = match self.materializer.materialize(job_id, &payload).await {
                    Ok(content) => QueryOutcome::Completed {
                        kind: resolved.kind,
                        content,
                    },
                    Err(error) => {
                        tracing::error!(%job_id, error = %error, "materialization failed in the query path");
                        QueryOutcome::Failed {
                            kind: resolved.kind,
                            reason: "the finished result could not be retrieved".to_string(),
                        }
                    }
                };

                if registered {
                    // Removal happens after the materialization attempt, the
                    // same ordering the monitor uses before its push.
                    self.finish_terminal(job_id).await;
                } else {
                    self.router.forget(job_id).await;
                }
                outcome
            }
            JobStatus::NotFound => QueryOutcome::NotFound,
        }
    }
}
