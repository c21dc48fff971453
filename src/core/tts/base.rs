//! Speech synthesis provider abstraction.

use async_trait::async_trait;
use thiserror::Error;

/// Synthesized audio in the provider's native format: 16-bit
/// little-endian linear PCM, mono, at `sample_rate`.
#[derive(Debug, Clone)]
pub struct NativeAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("synthesis endpoint returned status {0}")]
    Status(u16),
    #[error("malformed synthesis response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait BaseSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<NativeAudio, TtsError>;
}
