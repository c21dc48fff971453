//! Shared fixtures: mock collaborators and a test server harness.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use reacho::config::ServerConfig;
use reacho::core::Engines;
use reacho::core::llm::{EmbeddingClient, TokenGenerator};
use reacho::core::records::{CallRecord, CallRecordSink};
use reacho::core::stt::{
    BaseRecognizer, RecognitionResult, RecognizerConfig, RecognizerFactory, ResultCallback,
    SttError,
};
use reacho::core::tts::{BaseSynthesizer, NativeAudio, TtsError};
use reacho::routes::build_router;
use reacho::state::AppState;
use reacho::telephony::{Telephony, TelephonyError};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------
// Telephony

pub struct MockTelephony {
    pub placements: Mutex<Vec<String>>,
    pub ended: Mutex<Vec<String>>,
    pub fail: bool,
}

impl MockTelephony {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            placements: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
            fail: false,
        })
    }
}

#[async_trait]
impl Telephony for MockTelephony {
    async fn place_call(&self, to: &str) -> Result<String, TelephonyError> {
        if self.fail {
            return Err(TelephonyError::Api {
                status: 400,
                body: "rejected".to_string(),
            });
        }
        let mut placements = self.placements.lock();
        placements.push(to.to_string());
        Ok(format!("CA-mock-{}", placements.len()))
    }

    async fn end_call(&self, call_sid: &str) -> Result<(), TelephonyError> {
        self.ended.lock().push(call_sid.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Generation

/// Yields pre-scripted token sequences, one script per generation turn,
/// with an optional delay between tokens. The last script repeats once
/// the queue is exhausted.
pub struct ScriptedGenerator {
    scripts: Mutex<VecDeque<Vec<String>>>,
    pub token_delay: Duration,
}

impl ScriptedGenerator {
    pub fn new(scripts: Vec<Vec<&str>>, token_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|s| s.into_iter().map(str::to_string).collect())
                    .collect(),
            ),
            token_delay,
        })
    }
}

#[async_trait]
impl TokenGenerator for ScriptedGenerator {
    async fn stream_response(&self, _prompt: String) -> mpsc::Receiver<String> {
        let tokens = {
            let mut scripts = self.scripts.lock();
            if scripts.len() > 1 {
                scripts.pop_front().unwrap_or_default()
            } else {
                scripts.front().cloned().unwrap_or_default()
            }
        };
        let delay = self.token_delay;
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for token in tokens {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(token).await.is_err() {
                    return;
                }
            }
        });
        rx
    }
}

// ---------------------------------------------------------------------
// Synthesis

/// PCM length encodes the unit's character count (one sample per char at
/// the wire rate), so tests can tell responses apart by payload size.
/// Optionally fails every unit that does not contain `succeed_marker`.
pub struct LengthSynthesizer {
    pub succeed_marker: Option<String>,
}

impl LengthSynthesizer {
    pub fn reliable() -> Arc<Self> {
        Arc::new(Self {
            succeed_marker: None,
        })
    }

    pub fn failing_except(marker: &str) -> Arc<Self> {
        Arc::new(Self {
            succeed_marker: Some(marker.to_string()),
        })
    }
}

#[async_trait]
impl BaseSynthesizer for LengthSynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> Result<NativeAudio, TtsError> {
        if let Some(marker) = &self.succeed_marker {
            if !text.contains(marker.as_str()) {
                return Err(TtsError::Malformed("scripted failure".to_string()));
            }
        }
        Ok(NativeAudio {
            pcm: vec![0u8; text.chars().count() * 2],
            sample_rate: 8_000,
        })
    }
}

// ---------------------------------------------------------------------
// Recognition

struct ScriptedRecognizer {
    callback: Option<ResultCallback>,
    shared: Arc<RecognizerShared>,
}

pub struct RecognizerShared {
    pub created: Mutex<usize>,
    pub batches: Mutex<Vec<Vec<u8>>>,
    pub finals: Mutex<VecDeque<String>>,
}

#[async_trait]
impl BaseRecognizer for ScriptedRecognizer {
    async fn connect(&mut self) -> Result<(), SttError> {
        Ok(())
    }
    async fn disconnect(&mut self) -> Result<(), SttError> {
        Ok(())
    }
    fn is_ready(&self) -> bool {
        true
    }
    async fn send_audio(&self, chunk: Vec<u8>) -> Result<(), SttError> {
        self.shared.batches.lock().push(chunk);
        let next = self.shared.finals.lock().pop_front();
        if let (Some(transcript), Some(callback)) = (next, &self.callback) {
            callback(RecognitionResult {
                transcript,
                is_final: true,
                confidence: 0.99,
            })
            .await;
        }
        Ok(())
    }
    fn on_result(&mut self, callback: ResultCallback) {
        self.callback = Some(callback);
    }
}

/// Factory whose recognizers emit one scripted final transcript per
/// audio batch, recording batches and creations for assertions.
pub struct ScriptedRecognizerFactory {
    pub shared: Arc<RecognizerShared>,
}

impl ScriptedRecognizerFactory {
    pub fn new(finals: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(RecognizerShared {
                created: Mutex::new(0),
                batches: Mutex::new(Vec::new()),
                finals: Mutex::new(finals.into_iter().map(str::to_string).collect()),
            }),
        })
    }
}

impl RecognizerFactory for ScriptedRecognizerFactory {
    fn create(&self, _config: &RecognizerConfig) -> Box<dyn BaseRecognizer> {
        *self.shared.created.lock() += 1;
        Box::new(ScriptedRecognizer {
            callback: None,
            shared: self.shared.clone(),
        })
    }
}

// ---------------------------------------------------------------------
// Records

pub struct CapturingSink {
    pub records: Mutex<Vec<CallRecord>>,
}

impl CapturingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CallRecordSink for CapturingSink {
    async fn record_call(&self, record: CallRecord) {
        self.records.lock().push(record);
    }
}

pub struct NoEmbedder;

#[async_trait]
impl EmbeddingClient for NoEmbedder {
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

// ---------------------------------------------------------------------
// Harness

pub fn fast_test_config() -> ServerConfig {
    ServerConfig {
        audio_flush_threshold: 160,
        inter_call_delay: Duration::from_millis(10),
        idle_poll_interval: Duration::from_millis(10),
        max_idle_polls: 2,
        ..ServerConfig::default()
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
}

/// Binds an ephemeral port and serves the full router, the same way
/// `main` does.
pub async fn spawn_app(
    config: ServerConfig,
    telephony: Arc<dyn Telephony>,
    engines: Arc<Engines>,
    records: Arc<dyn CallRecordSink>,
) -> TestApp {
    let state = AppState::with_components(config, telephony, engines, records);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestApp { addr, state }
}

pub async fn connect_stream(addr: SocketAddr, call_sid: &str) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/stream/{call_sid}"))
        .await
        .expect("websocket connect");
    ws
}

pub async fn send_json(ws: &mut WsClient, frame: serde_json::Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

pub async fn send_start(ws: &mut WsClient, stream_sid: &str, call_sid: &str) {
    send_json(
        ws,
        serde_json::json!({
            "event": "start",
            "sequenceNumber": "1",
            "streamSid": stream_sid,
            "start": { "streamSid": stream_sid, "callSid": call_sid }
        }),
    )
    .await;
}

pub async fn send_media(ws: &mut WsClient, stream_sid: &str, audio: &[u8]) {
    use base64::Engine as _;
    let payload = base64::engine::general_purpose::STANDARD.encode(audio);
    send_json(
        ws,
        serde_json::json!({
            "event": "media",
            "streamSid": stream_sid,
            "media": { "track": "inbound", "payload": payload }
        }),
    )
    .await;
}

pub async fn send_stop(ws: &mut WsClient, stream_sid: &str) {
    send_json(
        ws,
        serde_json::json!({ "event": "stop", "streamSid": stream_sid }),
    )
    .await;
}

/// Next outbound JSON frame, with a timeout.
pub async fn recv_frame(ws: &mut WsClient) -> serde_json::Value {
    let deadline = Duration::from_secs(5);
    loop {
        let message = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("outbound frame in time")
            .expect("stream open")
            .expect("frame ok");
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Decoded payload length of a `media` frame.
pub fn media_payload_len(frame: &serde_json::Value) -> usize {
    use base64::Engine as _;
    let payload = frame["media"]["payload"].as_str().expect("media payload");
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .expect("valid base64")
        .len()
}
