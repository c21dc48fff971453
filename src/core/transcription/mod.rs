//! Per-call transcription session.
//!
//! Owns the recognizer lifecycle for one call: a worker task holds the
//! live connection, pumps queued audio into it, and forwards final
//! transcripts back to the session loop over a channel. The connection
//! is continuous; if the provider closes or errors mid-call, the worker
//! mints a fresh recognizer and keeps streaming.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::llm::EmbeddingClient;
use crate::core::stt::{RecognitionResult, RecognizerConfig, RecognizerFactory, ResultCallback};

/// Bound on waiting for the worker to drain and exit during `stop`.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before retrying after a failed recognizer connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// A finalized transcript segment, delivered to the session loop.
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    pub call_sid: String,
    pub transcript: String,
    pub confidence: f64,
    /// Semantic embedding of the transcript, when an embedder is
    /// configured and reachable.
    pub embedding: Option<Vec<f32>>,
}

/// Handle to a running transcription worker.
pub struct TranscriptionSession {
    call_sid: String,
    audio_tx: mpsc::UnboundedSender<Option<Vec<u8>>>,
    stopping: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TranscriptionSession {
    /// Spawns the worker and returns the handle. Final transcripts flow
    /// out through `events`; interims are logged at debug level only.
    pub fn start(
        call_sid: String,
        factory: Arc<dyn RecognizerFactory>,
        config: RecognizerConfig,
        embedder: Option<Arc<dyn EmbeddingClient>>,
        events: mpsc::UnboundedSender<TranscriptEvent>,
    ) -> Self {
        let stopping = Arc::new(AtomicBool::new(false));
        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker_loop(
            call_sid.clone(),
            factory,
            config,
            embedder,
            events,
            audio_rx,
            stopping.clone(),
        ));
        Self {
            call_sid,
            audio_tx,
            stopping,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queues a chunk of wire audio for recognition. Non-blocking; audio
    /// arriving after `stop` is dropped.
    pub fn add_audio(&self, chunk: Vec<u8>) {
        if self.stopping.load(Ordering::SeqCst) {
            debug!(call_sid = %self.call_sid, "dropping audio queued after stop");
            return;
        }
        let _ = self.audio_tx.send(Some(chunk));
    }

    /// Stops the worker: signals shutdown, unblocks the queue with a
    /// sentinel, and waits a bounded time for the task to drain before
    /// aborting it. Safe to call more than once.
    pub async fn stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.audio_tx.send(None);

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let abort = worker.abort_handle();
            if tokio::time::timeout(STOP_JOIN_TIMEOUT, worker).await.is_err() {
                warn!(
                    call_sid = %self.call_sid,
                    "transcription worker did not stop in time, aborting"
                );
                abort.abort();
            }
        }
        info!(call_sid = %self.call_sid, "transcription session stopped");
    }
}

fn make_result_callback(
    call_sid: String,
    embedder: Option<Arc<dyn EmbeddingClient>>,
    events: mpsc::UnboundedSender<TranscriptEvent>,
) -> ResultCallback {
    Arc::new(move |result: RecognitionResult| {
        let call_sid = call_sid.clone();
        let embedder = embedder.clone();
        let events = events.clone();
        Box::pin(async move {
            if !result.is_final {
                debug!(call_sid = %call_sid, transcript = %result.transcript, "interim transcript");
                return;
            }
            let transcript = result.transcript.trim();
            if transcript.is_empty() {
                return;
            }
            let embedding = match &embedder {
                Some(embedder) => embedder.embed(transcript).await,
                None => None,
            };
            let _ = events.send(TranscriptEvent {
                call_sid,
                transcript: transcript.to_string(),
                confidence: result.confidence,
                embedding,
            });
        })
    })
}

async fn worker_loop(
    call_sid: String,
    factory: Arc<dyn RecognizerFactory>,
    config: RecognizerConfig,
    embedder: Option<Arc<dyn EmbeddingClient>>,
    events: mpsc::UnboundedSender<TranscriptEvent>,
    mut audio_rx: mpsc::UnboundedReceiver<Option<Vec<u8>>>,
    stopping: Arc<AtomicBool>,
) {
    'cycles: while !stopping.load(Ordering::SeqCst) {
        let mut recognizer = factory.create(&config);
        recognizer.on_result(make_result_callback(
            call_sid.clone(),
            embedder.clone(),
            events.clone(),
        ));

        if let Err(e) = recognizer.connect().await {
            error!(call_sid = %call_sid, error = %e, "recognizer connect failed, retrying");
            tokio::time::sleep(RECONNECT_DELAY).await;
            continue;
        }
        debug!(call_sid = %call_sid, "recognition cycle started");

        loop {
            match audio_rx.recv().await {
                Some(Some(chunk)) => {
                    if let Err(e) = recognizer.send_audio(chunk).await {
                        warn!(
                            call_sid = %call_sid,
                            error = %e,
                            "recognizer send failed, restarting cycle"
                        );
                        let _ = recognizer.disconnect().await;
                        continue 'cycles;
                    }
                }
                // Sentinel or handle dropped: drain and exit for good.
                Some(None) | None => {
                    let _ = recognizer.disconnect().await;
                    break 'cycles;
                }
            }
        }
    }
    debug!(call_sid = %call_sid, "transcription worker exited");
}
