//! Webhook ingress: messaging-platform events in, commands dispatched.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::jobs::{DeliverableContent, JobKind, NewJob};

use super::GatewayState;
use super::commands::{Command, parse_command};
use super::replies::{
    USAGE_TEXT, backend_unavailable_text, duplicate_job_text, status_reply,
    transcribe_submitted_text, video_submitted_text,
};

pub(super) const WEBHOOK_SECRET_HEADER: &str = "x-relay-webhook-secret";

const EVENT_WEBHOOK_VIDEO_SUBMITTED_REPLIED: &str = "webhook.command.video_submitted.replied";
const EVENT_WEBHOOK_TRANSCRIBE_SUBMITTED_REPLIED: &str =
    "webhook.command.transcribe_submitted.replied";
const EVENT_WEBHOOK_STATUS_REPLIED: &str = "webhook.command.status.replied";
const EVENT_WEBHOOK_USAGE_REPLIED: &str = "webhook.command.usage.replied";

const DEFAULT_SUMMARY_LANGUAGE: &str = "en";

#[derive(Debug)]
struct InboundMessage {
    user_id: String,
    reply_token: Option<String>,
    text: String,
}

pub(super) async fn handle_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<&'static str, (StatusCode, String)> {
    validate_secret_token(&headers, state.webhook_secret.as_deref())?;

    let Some(events) = payload.get("events").and_then(Value::as_array) else {
        return Ok("OK");
    };
    for event in events {
        match parse_message_event(event) {
            Some(inbound) => handle_inbound(&state, inbound).await,
            None => {
                tracing::debug!(
                    event_type = ?event.get("type"),
                    "event carries no text message; ignoring"
                );
            }
        }
    }
    Ok("OK")
}

fn validate_secret_token(
    headers: &HeaderMap,
    expected_secret: Option<&str>,
) -> Result<(), (StatusCode, String)> {
    let Some(expected) = expected_secret else {
        return Ok(());
    };
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided == expected {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            "invalid webhook secret token".to_string(),
        ))
    }
}

fn parse_message_event(event: &Value) -> Option<InboundMessage> {
    if event.get("type").and_then(Value::as_str) != Some("message") {
        return None;
    }
    let message = event.get("message")?;
    if message.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    let text = message.get("text").and_then(Value::as_str)?.to_string();
    let user_id = event
        .get("source")
        .and_then(|source| source.get("userId"))
        .and_then(Value::as_str)?
        .to_string();
    let reply_token = event
        .get("replyToken")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(InboundMessage {
        user_id,
        reply_token,
        text,
    })
}

async fn handle_inbound(state: &GatewayState, msg: InboundMessage) {
    tracing::info!(
        user = %msg.user_id,
        text_len = msg.text.chars().count(),
        "inbound message"
    );

    match parse_command(&msg.text) {
        Command::GenerateVideo { script } => {
            let reply = match state.synth.submit(&script).await {
                Ok(job_id) => submission_reply(state, &msg.user_id, job_id, JobKind::VideoGeneration, None).await,
                Err(error) => {
                    tracing::error!(user = %msg.user_id, error = %error, "video submission failed");
                    backend_unavailable_text()
                }
            };
            deliver(
                state,
                &msg,
                &DeliverableContent::Text(reply),
                EVENT_WEBHOOK_VIDEO_SUBMITTED_REPLIED,
            )
            .await;
        }
        Command::Transcribe { url } => {
            let reply = match state
                .transcriber
                .submit(&url, DEFAULT_SUMMARY_LANGUAGE)
                .await
            {
                Ok(job_id) => {
                    submission_reply(
                        state,
                        &msg.user_id,
                        job_id,
                        JobKind::Transcription,
                        Some(url),
                    )
                    .await
                }
                Err(error) => {
                    tracing::error!(user = %msg.user_id, error = %error, "transcription submission failed");
                    backend_unavailable_text()
                }
            };
            deliver(
                state,
                &msg,
                &DeliverableContent::Text(reply),
                EVENT_WEBHOOK_TRANSCRIBE_SUBMITTED_REPLIED,
            )
            .await;
        }
        Command::Status { job_id } => {
            let outcome = state.service.query_status(&job_id, &msg.user_id).await;
            let content = status_reply(&job_id, outcome);
            deliver(state, &msg, &content, EVENT_WEBHOOK_STATUS_REPLIED).await;
        }
        Command::Help => {
            deliver(
                state,
                &msg,
                &DeliverableContent::Text(USAGE_TEXT.to_string()),
                EVENT_WEBHOOK_USAGE_REPLIED,
            )
            .await;
        }
    }
}

/// Register the submitted job and start its monitor, then word the reply.
async fn submission_reply(
    state: &GatewayState,
    user_id: &str,
    job_id: String,
    kind: JobKind,
    origin_url: Option<String>,
) -> String {
    let started = state
        .service
        .start_monitor(NewJob {
            job_id: job_id.clone(),
            owner_user_id: user_id.to_string(),
            kind_hint: Some(kind),
            origin_url,
        })
        .await;
    if !started {
        return duplicate_job_text(&job_id);
    }
    match kind {
        JobKind::VideoGeneration => video_submitted_text(&job_id),
        JobKind::Transcription => transcribe_submitted_text(&job_id),
    }
}

/// Reply when the event carries a token, push otherwise; failures only log.
async fn deliver(
    state: &GatewayState,
    msg: &InboundMessage,
    content: &DeliverableContent,
    event_name: &str,
) {
    let result = match msg.reply_token.as_deref() {
        Some(token) => state.channel.reply(token, content).await,
        None => state.channel.push(&msg.user_id, content).await,
    };
    match result {
        Ok(()) => tracing::debug!(user = %msg.user_id, event = event_name, "reply sent"),
        Err(error) => {
            tracing::error!(
                user = %msg.user_id,
                event = event_name,
                error = %error,
                "failed to send reply"
            );
        }
    }
}
