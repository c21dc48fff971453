//! Telephony webhooks: call answer (TwiML) and lifecycle status.

use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::session::CallStatus;
use crate::state::AppState;

/// Provider statuses after which the call will never produce more media.
const TERMINAL_STATUSES: [&str; 5] = ["completed", "failed", "busy", "no-answer", "canceled"];

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
}

/// `POST /outbound_call` - the call was answered; return TwiML that
/// connects the audio to our media stream endpoint. The spoken opening
/// comes from the session's intro turn once the stream starts.
pub async fn outbound_call(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AnswerForm>,
) -> Response {
    let call_sid = form.call_sid.unwrap_or_default();
    let stream_url = state.config.ws_stream_url(&call_sid);
    info!(%call_sid, %stream_url, "answer webhook, connecting media stream");

    let twiml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Connect>
        <Stream url="{stream_url}" />
    </Connect>
</Response>"#
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        twiml,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
}

/// `POST /call_status` - lifecycle updates from the provider. Terminal
/// statuses end the session; when no media stream is attached (busy,
/// no-answer, failed before connect) this webhook also owns cleanup and
/// the final record, otherwise stream teardown does.
pub async fn call_status(
    State(state): State<Arc<AppState>>,
    Form(form): Form<StatusForm>,
) -> StatusCode {
    let Some(call_sid) = form.call_sid else {
        warn!("status webhook without CallSid");
        return StatusCode::OK;
    };
    let status = form.call_status.unwrap_or_default();
    info!(%call_sid, %status, "call status update");

    if !TERMINAL_STATUSES.contains(&status.as_str()) {
        return StatusCode::OK;
    }

    if let Some(session) = state.registry.get(&call_sid) {
        session.set_status(CallStatus::Ended);
        if !session.has_transport() && state.registry.remove(&call_sid).is_some() {
            state.records.record_call(session.to_record()).await;
        }
    }
    StatusCode::OK
}
