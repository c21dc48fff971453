//! Streaming speech recognition provider abstraction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Async callback invoked for every recognition result.
pub type ResultCallback =
    Arc<dyn Fn(RecognitionResult) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A single recognition result from the provider.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub transcript: String,
    /// Whether the provider considers this segment final.
    pub is_final: bool,
    pub confidence: f64,
}

/// Recognizer connection parameters.
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub api_key: String,
    pub model: String,
    /// BCP-47 language tag.
    pub language: String,
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub punctuate: bool,
    pub interim_results: bool,
}

impl RecognizerConfig {
    /// Configuration matching a telephony media stream leg: 8 kHz mono
    /// mu-law with punctuation on.
    pub fn telephony(api_key: String, model: String, language: String) -> Self {
        Self {
            api_key,
            model,
            language,
            encoding: "mulaw".to_string(),
            sample_rate: 8_000,
            channels: 1,
            punctuate: true,
            interim_results: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SttError {
    #[error("recognizer connection failed: {0}")]
    ConnectionFailed(String),
    #[error("failed to send audio: {0}")]
    SendFailed(String),
    #[error("recognizer is not connected")]
    NotConnected,
    #[error("invalid recognizer configuration: {0}")]
    InvalidConfig(String),
}

/// A streaming recognizer connection.
///
/// Implementations own a live provider connection: audio goes in via
/// `send_audio`, results come back through the callback registered with
/// `on_result` (register before `connect` so no result is dropped).
#[async_trait]
pub trait BaseRecognizer: Send + Sync {
    async fn connect(&mut self) -> Result<(), SttError>;
    async fn disconnect(&mut self) -> Result<(), SttError>;
    fn is_ready(&self) -> bool;
    async fn send_audio(&self, chunk: Vec<u8>) -> Result<(), SttError>;
    fn on_result(&mut self, callback: ResultCallback);
}

/// Mints fresh recognizer connections. Sessions create one recognizer
/// per streaming cycle; tests inject factories producing mocks.
pub trait RecognizerFactory: Send + Sync {
    fn create(&self, config: &RecognizerConfig) -> Box<dyn BaseRecognizer>;
}
