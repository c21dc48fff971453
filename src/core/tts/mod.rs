pub mod base;
pub mod chunker;
pub mod google;
pub mod stream;

pub use base::{BaseSynthesizer, NativeAudio, TtsError};
pub use chunker::SentenceChunker;
pub use google::GoogleSynthesizer;
pub use stream::SpeechStream;
