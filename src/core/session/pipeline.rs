//! The response pipeline: tokens in, phone audio out.
//!
//! One pipeline runs per response turn. Generation tokens stream through
//! the sentence chunker; each completed unit is synthesized, converted
//! to wire format, and shipped as a `media` + `mark` frame pair.
//!
//! Cancellation is cooperative: barge-in sets the cancel flag and the
//! pipeline checks it before every send, so an already-cancelled
//! pipeline can never slip audio onto the wire after the `clear` frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CallSession, CallStatus};
use crate::core::Engines;
use crate::core::llm::FALLBACK_RESPONSE;
use crate::core::session::events::OutboundEvent;
use crate::core::tts::{SentenceChunker, SpeechStream};

/// Handle to an in-flight response pipeline.
pub struct ResponsePipeline {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ResponsePipeline {
    /// Requests cooperative cancellation. The task keeps running until
    /// its next checkpoint but will not send any further audio.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Runs the pipeline to completion. Used for the scripted intro
    /// turn, which must finish before the listen/speak loop starts.
    pub async fn wait(self) {
        let _ = self.handle.await;
    }
}

/// Spawns a pipeline for one response turn. Marks synthesis as in
/// flight before returning, so a transcript arriving immediately after
/// still sees the flag set.
pub fn spawn_response(
    session: Arc<CallSession>,
    engines: Arc<Engines>,
    out_tx: mpsc::Sender<OutboundEvent>,
    prompt: String,
) -> ResponsePipeline {
    let cancel = Arc::new(AtomicBool::new(false));
    session.set_synthesis_in_flight(true);
    let handle = tokio::spawn(run(session, engines, out_tx, prompt, cancel.clone()));
    ResponsePipeline { cancel, handle }
}

async fn run(
    session: Arc<CallSession>,
    engines: Arc<Engines>,
    out_tx: mpsc::Sender<OutboundEvent>,
    prompt: String,
    cancel: Arc<AtomicBool>,
) {
    let language = session.language().to_string();
    let speech = SpeechStream::new(engines.synthesizer.clone());

    session.set_status(CallStatus::Speaking);

    let mut tokens = engines.generator.stream_response(prompt).await;
    let mut chunker = SentenceChunker::new(&language);
    let mut full_text = String::new();
    let mut delivered = 0usize;

    while let Some(token) = tokens.recv().await {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        full_text.push_str(&token);
        for unit in chunker.push(&token) {
            deliver_unit(&session, &speech, &out_tx, &cancel, &unit, &language, &mut delivered)
                .await;
        }
    }

    if !cancel.load(Ordering::SeqCst) {
        if let Some(rest) = chunker.finish() {
            deliver_unit(&session, &speech, &out_tx, &cancel, &rest, &language, &mut delivered)
                .await;
        }

        // Nothing made it onto the wire: the caller must still hear
        // something, so fall back to the apology utterance.
        if delivered == 0 {
            warn!(
                call_sid = %session.call_sid(),
                "no audio delivered for response, sending apology"
            );
            let mut chunks =
                speech.stream_synthesize(FALLBACK_RESPONSE.to_string(), language.clone());
            while let Some(wire) = chunks.recv().await {
                if wire.is_empty() || cancel.load(Ordering::SeqCst) {
                    continue;
                }
                send_media(&session, &out_tx, wire).await;
                delivered += 1;
            }
            if full_text.trim().is_empty() {
                full_text = FALLBACK_RESPONSE.to_string();
            }
        }
    }

    if cancel.load(Ordering::SeqCst) {
        // Superseded mid-turn: the new pipeline owns the flags now.
        debug!(call_sid = %session.call_sid(), "response pipeline cancelled");
        return;
    }

    let full_text = full_text.trim();
    if !full_text.is_empty() {
        session.push_assistant_turn(full_text);
    }
    session.set_synthesis_in_flight(false);
    session.set_status(CallStatus::Listening);
    debug!(
        call_sid = %session.call_sid(),
        chunks = delivered,
        "response pipeline complete"
    );
}

async fn deliver_unit(
    session: &Arc<CallSession>,
    speech: &SpeechStream,
    out_tx: &mpsc::Sender<OutboundEvent>,
    cancel: &Arc<AtomicBool>,
    unit: &str,
    language: &str,
    delivered: &mut usize,
) {
    if cancel.load(Ordering::SeqCst) {
        return;
    }
    let wire = speech.synthesize_unit(unit, language).await;
    if wire.is_empty() {
        // Empty marker from a failed unit; skip it.
        return;
    }
    // Check-before-send: cancellation may have landed during synthesis.
    if cancel.load(Ordering::SeqCst) {
        return;
    }
    send_media(session, out_tx, wire).await;
    *delivered += 1;
}

async fn send_media(
    session: &Arc<CallSession>,
    out_tx: &mpsc::Sender<OutboundEvent>,
    wire: Vec<u8>,
) {
    let Some(stream_sid) = session.stream_sid() else {
        warn!(call_sid = %session.call_sid(), "dropping audio, no stream attached");
        return;
    };
    let _ = out_tx
        .send(OutboundEvent::media(&stream_sid, &wire))
        .await;
    session.mark_sent();
    let _ = out_tx
        .send(OutboundEvent::mark(&stream_sid, Uuid::new_v4().to_string()))
        .await;
}
