//! Response generation provider abstraction.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Spoken to the caller when generation fails; the pipeline treats it
/// like any other token so the caller never gets dead air.
pub const FALLBACK_RESPONSE: &str = "I'm sorry, I'm having trouble processing that right now.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("generation endpoint returned status {0}")]
    Status(u16),
    #[error("generation stream produced no tokens")]
    EmptyStream,
}

/// Streams response tokens for a prompt.
///
/// Implementations never fail outward: on provider errors the stream
/// yields [`FALLBACK_RESPONSE`] as its last token and closes. Dropping
/// the receiver cancels interest and the implementation stops consuming
/// the upstream.
#[async_trait]
pub trait TokenGenerator: Send + Sync {
    async fn stream_response(&self, prompt: String) -> mpsc::Receiver<String>;
}

/// Produces semantic embeddings for transcript segments.
///
/// Best-effort: failures yield `None` and are logged, never propagated.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}
