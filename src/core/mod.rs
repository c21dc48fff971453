//! Core call-processing engine: audio buffering and codec conversion,
//! streaming recognition, response generation, speech synthesis, and the
//! per-call session state machine.

pub mod audio;
pub mod llm;
pub mod records;
pub mod session;
pub mod stt;
pub mod transcription;
pub mod tts;

use std::sync::Arc;

use crate::core::llm::{EmbeddingClient, TokenGenerator};
use crate::core::stt::RecognizerFactory;
use crate::core::tts::BaseSynthesizer;

/// The pluggable engine set behind a call: recognition, generation,
/// synthesis, and optional transcript embedding. Held behind trait
/// objects so tests can swap any collaborator for a mock.
pub struct Engines {
    pub recognizers: Arc<dyn RecognizerFactory>,
    pub generator: Arc<dyn TokenGenerator>,
    pub synthesizer: Arc<dyn BaseSynthesizer>,
    pub embedder: Option<Arc<dyn EmbeddingClient>>,
}
