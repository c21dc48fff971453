//! Streaming speech synthesis over sentence units.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use super::base::BaseSynthesizer;
use super::chunker::SentenceChunker;
use crate::core::audio::pcm16_to_wire;

/// Wraps a synthesizer with chunking and wire-format conversion.
///
/// A failed unit yields an empty chunk rather than an error, so one bad
/// sentence never kills the rest of an utterance; consumers skip empty
/// chunks.
#[derive(Clone)]
pub struct SpeechStream {
    synthesizer: Arc<dyn BaseSynthesizer>,
}

impl SpeechStream {
    pub fn new(synthesizer: Arc<dyn BaseSynthesizer>) -> Self {
        Self { synthesizer }
    }

    /// Synthesizes one sentence unit and converts it to wire bytes.
    /// Empty on failure.
    pub async fn synthesize_unit(&self, text: &str, language: &str) -> Vec<u8> {
        match self.synthesizer.synthesize(text, language).await {
            Ok(audio) => pcm16_to_wire(&audio.pcm, audio.sample_rate),
            Err(e) => {
                warn!(error = %e, unit = %text, "synthesis failed for unit");
                Vec::new()
            }
        }
    }

    /// Splits `text` into sentence units and yields a wire chunk per
    /// unit, in order. Failed units come through as empty chunks.
    pub fn stream_synthesize(&self, text: String, language: String) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(8);
        let stream = self.clone();
        tokio::spawn(async move {
            let mut chunker = SentenceChunker::new(&language);
            let mut units = chunker.push(&text);
            if let Some(rest) = chunker.finish() {
                units.push(rest);
            }
            for unit in units {
                let chunk = stream.synthesize_unit(&unit, &language).await;
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        });
        rx
    }
}
