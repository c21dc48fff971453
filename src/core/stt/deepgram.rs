//! Deepgram streaming recognizer over WebSocket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, error, info, warn};
use url::Url;

use super::base::{
    BaseRecognizer, RecognitionResult, RecognizerConfig, RecognizerFactory, ResultCallback,
    SttError,
};

const DEEPGRAM_WS_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Silence duration (ms) after which Deepgram finalizes a segment.
const ENDPOINTING_MS: u32 = 300;

#[derive(Debug, Deserialize)]
struct DeepgramMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    channel: Option<DeepgramChannel>,
    is_final: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    transcript: String,
    confidence: Option<f64>,
}

/// Live Deepgram connection.
///
/// `connect` opens the socket and spawns a connection task that pumps
/// queued audio out and recognition results back through the registered
/// callback. `disconnect` asks Deepgram to flush with a `CloseStream`
/// control message before tearing the task down.
pub struct DeepgramRecognizer {
    config: RecognizerConfig,
    callback: Option<ResultCallback>,
    audio_tx: Option<mpsc::Sender<Message>>,
    connected: Arc<AtomicBool>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DeepgramRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            config,
            callback: None,
            audio_tx: None,
            connected: Arc::new(AtomicBool::new(false)),
            shutdown_tx: None,
            task: None,
        }
    }

    fn build_websocket_url(config: &RecognizerConfig) -> Result<String, SttError> {
        let mut url = Url::parse(DEEPGRAM_WS_URL)
            .map_err(|e| SttError::InvalidConfig(format!("bad base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("model", &config.model)
            .append_pair("language", &config.language)
            .append_pair("encoding", &config.encoding)
            .append_pair("sample_rate", &config.sample_rate.to_string())
            .append_pair("channels", &config.channels.to_string())
            .append_pair("punctuate", &config.punctuate.to_string())
            .append_pair("interim_results", &config.interim_results.to_string())
            .append_pair("endpointing", &ENDPOINTING_MS.to_string());
        Ok(url.to_string())
    }

    async fn handle_text_frame(text: &str, callback: &Option<ResultCallback>) {
        let parsed: DeepgramMessage = match serde_json::from_str(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "ignoring unparseable recognizer frame");
                return;
            }
        };

        if parsed.kind.as_deref() != Some("Results") {
            debug!(kind = ?parsed.kind, "recognizer control frame");
            return;
        }

        let Some(alternative) = parsed
            .channel
            .as_ref()
            .and_then(|c| c.alternatives.first())
        else {
            return;
        };

        let result = RecognitionResult {
            transcript: alternative.transcript.clone(),
            is_final: parsed.is_final.unwrap_or(false),
            confidence: alternative.confidence.unwrap_or(0.0),
        };

        if result.transcript.is_empty() && !result.is_final {
            return;
        }

        if let Some(callback) = callback {
            callback(result).await;
        }
    }
}

#[async_trait]
impl BaseRecognizer for DeepgramRecognizer {
    async fn connect(&mut self) -> Result<(), SttError> {
        if self.config.api_key.trim().is_empty() {
            return Err(SttError::InvalidConfig("missing API key".to_string()));
        }

        let url = Self::build_websocket_url(&self.config)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| SttError::ConnectionFailed(e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            format!("Token {}", self.config.api_key)
                .parse()
                .map_err(|_| SttError::InvalidConfig("API key is not header-safe".to_string()))?,
        );

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| SttError::ConnectionFailed(e.to_string()))?;
        let (mut ws_sink, mut ws_source) = ws_stream.split();

        let (audio_tx, mut audio_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

        let connected = self.connected.clone();
        connected.store(true, Ordering::SeqCst);
        let callback = self.callback.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = audio_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if let Err(e) = ws_sink.send(message).await {
                                    warn!(error = %e, "recognizer socket send failed");
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    inbound = ws_source.next() => {
                        match inbound {
                            Some(Ok(Message::Text(text))) => {
                                Self::handle_text_frame(text.as_str(), &callback).await;
                            }
                            Some(Ok(Message::Close(_))) => {
                                info!("recognizer closed the stream");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!(error = %e, "recognizer socket error");
                                break;
                            }
                            None => break,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("recognizer connection task shutting down");
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
        });

        self.audio_tx = Some(audio_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        info!(
            model = %self.config.model,
            language = %self.config.language,
            "recognizer connected"
        );
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), SttError> {
        // Ask the provider to flush any pending finals first.
        if let Some(audio_tx) = &self.audio_tx {
            let _ = audio_tx
                .send(Message::Text(r#"{"type":"CloseStream"}"#.into()))
                .await;
        }
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(std::time::Duration::from_secs(2), task)
                .await
                .is_err()
            {
                warn!("recognizer connection task did not exit in time, aborting");
                abort.abort();
            }
        }
        self.audio_tx = None;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_audio(&self, chunk: Vec<u8>) -> Result<(), SttError> {
        if !self.is_ready() {
            return Err(SttError::NotConnected);
        }
        let audio_tx = self.audio_tx.as_ref().ok_or(SttError::NotConnected)?;
        audio_tx
            .send(Message::Binary(chunk.into()))
            .await
            .map_err(|e| SttError::SendFailed(e.to_string()))
    }

    fn on_result(&mut self, callback: ResultCallback) {
        self.callback = Some(callback);
    }
}

impl Drop for DeepgramRecognizer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            error!("recognizer dropped while connected, aborting connection task");
            task.abort();
        }
    }
}

/// Factory producing live Deepgram connections.
pub struct DeepgramFactory;

impl RecognizerFactory for DeepgramFactory {
    fn create(&self, config: &RecognizerConfig) -> Box<dyn BaseRecognizer> {
        Box::new(DeepgramRecognizer::new(config.clone()))
    }
}
