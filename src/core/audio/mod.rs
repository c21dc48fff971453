pub mod buffer;
pub mod codec;

pub use buffer::{AudioBuffer, DEFAULT_FLUSH_THRESHOLD};
pub use codec::{WIRE_SAMPLE_RATE, pcm16_to_wire};
