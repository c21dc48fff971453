pub mod base;
pub mod deepgram;

pub use base::{
    BaseRecognizer, RecognitionResult, RecognizerConfig, RecognizerFactory, ResultCallback,
    SttError,
};
pub use deepgram::{DeepgramFactory, DeepgramRecognizer};
