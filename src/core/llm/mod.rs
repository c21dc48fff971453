pub mod base;
pub mod gemini;
pub mod prompt;

pub use base::{EmbeddingClient, FALLBACK_RESPONSE, LlmError, TokenGenerator};
pub use gemini::{GeminiEmbedder, GeminiGenerator};
