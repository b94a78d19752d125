//! User-facing reply formatting for webhook commands.

use crate::jobs::{DeliverableContent, QueryOutcome};

pub(super) const USAGE_TEXT: &str = "I can do three things:\n\
- `video <script>` — render a narrated AI video from your text\n\
- send a video URL (or `transcribe <url>`) — transcribe and summarize it\n\
- `status <job id>` or just the job id — check on a submitted job";

pub(super) fn video_submitted_text(job_id: &str) -> String {
    format!(
        "Video job submitted.\nJob id: {job_id}\nThe clip will be sent to you when rendering finishes."
    )
}

pub(super) fn transcribe_submitted_text(job_id: &str) -> String {
    format!(
        "Transcription started.\nJob id: {job_id}\nThe summary will be sent to you when it is ready."
    )
}

pub(super) fn backend_unavailable_text() -> String {
    "That backend is unavailable right now; please try again later.".to_string()
}

pub(super) fn duplicate_job_text(job_id: &str) -> String {
    format!("Job {job_id} is already being tracked; you will be notified when it finishes.")
}

/// Turn a query outcome into the content the webhook replies with.
pub(super) fn status_reply(job_id: &str, outcome: QueryOutcome) -> DeliverableContent {
    match outcome {
        QueryOutcome::NotFound => DeliverableContent::Text(format!(
            "Job {job_id} was not found on any backend.\nIt may have expired, or the id may be wrong."
        )),
        QueryOutcome::Processing { detail, .. } => {
            let detail = detail
                .map(|detail| format!("\n{detail}"))
                .unwrap_or_default();
            DeliverableContent::Text(format!(
                "Job {job_id} is still processing.{detail}\nYou will get the result automatically once it finishes."
            ))
        }
        QueryOutcome::Failed { reason, .. } => {
            DeliverableContent::Text(format!("Job {job_id} failed: {reason}"))
        }
        QueryOutcome::Completed { content, .. } => match content {
            DeliverableContent::Text(text) => {
                DeliverableContent::Text(format!("Job {job_id} finished.\n\n{text}"))
            }
            video @ DeliverableContent::Video { .. } => video,
        },
        QueryOutcome::AlreadyDelivered { .. } => DeliverableContent::Text(format!(
            "Job {job_id} just finished and its result was already delivered to you."
        )),
    }
}
