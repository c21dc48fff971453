//! The media stream WebSocket handler: the per-call session loop.
//!
//! One task per call drives the whole conversation. Inbound frames and
//! final transcripts are consumed in a single `select!` loop, which is
//! the only place barge-in and pipeline hand-off decisions are made;
//! everything else (recognition, generation, synthesis) happens in
//! worker tasks that communicate through channels.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::audio::AudioBuffer;
use crate::core::llm::prompt;
use crate::core::session::events::{InboundEvent, OutboundEvent};
use crate::core::session::pipeline::{self, ResponsePipeline};
use crate::core::session::{CallSession, CallStatus, CampaignContext, LeadContext};
use crate::core::transcription::{TranscriptEvent, TranscriptionSession};
use crate::state::AppState;

pub async fn stream_handler(
    ws: WebSocketUpgrade,
    Path(call_sid): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!(%call_sid, "media stream connection request");
    ws.on_upgrade(move |socket| run_media_stream(socket, call_sid, state))
}

/// Resolves the session for a connecting stream. Calls placed by the
/// dialer already sit in the registry; anything else (a manually dialed
/// call, a webhook race) gets a placeholder session so the conversation
/// can still run.
fn resolve_session(state: &Arc<AppState>, call_sid: &str) -> Arc<CallSession> {
    if let Some(session) = state.registry.get(call_sid) {
        return session;
    }
    let session = CallSession::new(
        call_sid.to_string(),
        LeadContext::unknown(),
        CampaignContext::fallback(&state.config.default_language),
    );
    match state.registry.register(session.clone()) {
        Ok(()) => {
            info!(%call_sid, "registered placeholder session for unknown call");
            session
        }
        // Lost a registration race; use whoever won.
        Err(_) => state
            .registry
            .get(call_sid)
            .unwrap_or(session),
    }
}

async fn run_media_stream(socket: WebSocket, call_sid: String, state: Arc<AppState>) {
    let session = resolve_session(&state, &call_sid);

    if !session.attach_transport() {
        warn!(%call_sid, "rejecting duplicate media stream for active call");
        return;
    }

    let (ws_sink, mut ws_source) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<OutboundEvent>(256);
    let sender_task = tokio::spawn(run_sender(ws_sink, out_rx, call_sid.clone()));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TranscriptEvent>();
    let transcription = TranscriptionSession::start(
        call_sid.clone(),
        state.engines.recognizers.clone(),
        state.config.recognizer_config(session.language()),
        state.engines.embedder.clone(),
        event_tx,
    );

    let mut buffer = AudioBuffer::new(state.config.audio_flush_threshold);
    let mut active_pipeline: Option<ResponsePipeline> = None;
    let mut started = false;

    loop {
        tokio::select! {
            frame = ws_source.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let event = match serde_json::from_str::<InboundEvent>(text.as_str()) {
                            Ok(event) => event,
                            Err(e) => {
                                debug!(%call_sid, error = %e, "ignoring unparseable frame");
                                continue;
                            }
                        };
                        match event {
                            InboundEvent::Start { stream_sid, start } => {
                                if started {
                                    debug!(%call_sid, "duplicate start event ignored");
                                    continue;
                                }
                                started = true;
                                let provider_sid = start.and_then(|s| s.call_sid);
                                info!(%call_sid, %stream_sid, ?provider_sid, "media stream started");
                                session.set_stream_sid(stream_sid);
                                session.set_status(CallStatus::Connected);

                                // The scripted intro runs to completion
                                // before any caller media is processed.
                                let intro = pipeline::spawn_response(
                                    session.clone(),
                                    state.engines.clone(),
                                    out_tx.clone(),
                                    prompt::intro_prompt(session.lead(), session.campaign()),
                                );
                                intro.wait().await;
                            }
                            InboundEvent::Media { media } => {
                                if !started {
                                    debug!(%call_sid, "media before start, dropping");
                                    continue;
                                }
                                match BASE64.decode(media.payload.as_bytes()) {
                                    Ok(audio) => {
                                        buffer.add(&audio);
                                        if let Some(chunk) = buffer.try_flush() {
                                            transcription.add_audio(chunk);
                                        }
                                    }
                                    Err(e) => {
                                        debug!(%call_sid, error = %e, "dropping undecodable media payload");
                                    }
                                }
                            }
                            InboundEvent::Dtmf { dtmf } => {
                                info!(%call_sid, digit = ?dtmf.digit, "dtmf received");
                            }
                            InboundEvent::Mark { mark } => {
                                session.mark_confirmed();
                                debug!(%call_sid, name = ?mark.name, "playback mark confirmed");
                            }
                            InboundEvent::Stop => {
                                info!(%call_sid, "stop event received");
                                break;
                            }
                            InboundEvent::Unknown => {
                                debug!(%call_sid, "ignoring unrecognized event");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(%call_sid, "media stream closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%call_sid, error = %e, "media stream transport error");
                        break;
                    }
                }
            }
            Some(event) = event_rx.recv() => {
                handle_transcript(&state, &session, &out_tx, &mut active_pipeline, event).await;
            }
        }
    }

    // Teardown. Whatever is still buffered goes to the recognizer before
    // it stops; the stop join is bounded so a hung provider cannot wedge
    // the call slot.
    if let Some(chunk) = buffer.flush_remaining() {
        transcription.add_audio(chunk);
    }
    transcription.stop().await;
    if let Some(pipeline) = active_pipeline.take() {
        pipeline.cancel();
    }
    session.detach_transport();
    if !session.status().is_terminal() {
        session.set_status(CallStatus::Interrupted);
    }
    if state.registry.remove(&call_sid).is_some() {
        state.records.record_call(session.to_record()).await;
    }
    sender_task.abort();
    info!(%call_sid, status = ?session.status(), "call session closed");
}

/// Barge-in decision point. A final transcript while synthesis is in
/// flight interrupts the agent: discard bridge-queued audio with a
/// `clear` frame, cancel the old pipeline, then start the next turn.
async fn handle_transcript(
    state: &Arc<AppState>,
    session: &Arc<CallSession>,
    out_tx: &mpsc::Sender<OutboundEvent>,
    active_pipeline: &mut Option<ResponsePipeline>,
    event: TranscriptEvent,
) {
    let transcript = event.transcript.trim();
    if transcript.is_empty() {
        return;
    }
    info!(
        call_sid = %session.call_sid(),
        %transcript,
        confidence = event.confidence,
        "final transcript"
    );

    if session.synthesis_in_flight() {
        info!(call_sid = %session.call_sid(), "caller barge-in, clearing queued audio");
        if let Some(stream_sid) = session.stream_sid() {
            let _ = out_tx.send(OutboundEvent::clear(&stream_sid)).await;
        }
        if let Some(pipeline) = active_pipeline.take() {
            pipeline.cancel();
        }
        session.set_synthesis_in_flight(false);
    }

    // History for the prompt is everything before this utterance; the
    // utterance itself rides in the prompt tail.
    let prior_turns = session.render_history();
    session.push_user_turn(transcript, event.embedding);
    let prompt = prompt::response_prompt(
        session.lead(),
        session.campaign(),
        &prior_turns,
        transcript,
    );

    *active_pipeline = Some(pipeline::spawn_response(
        session.clone(),
        state.engines.clone(),
        out_tx.clone(),
        prompt,
    ));
}

/// Serializes outbound events onto the socket in order. A dedicated
/// sender task keeps the session loop free of socket backpressure.
async fn run_sender(
    mut sink: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<OutboundEvent>,
    call_sid: String,
) {
    while let Some(event) = out_rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(text) => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!(%call_sid, error = %e, "outbound send failed, sender exiting");
                    break;
                }
            }
            Err(e) => {
                warn!(%call_sid, error = %e, "failed to serialize outbound event");
            }
        }
    }
}
