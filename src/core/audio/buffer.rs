//! Inbound audio accumulation.
//!
//! Media stream frames arrive as ~20 ms slices, far too small to hand to
//! the recognizer one at a time. The buffer accumulates wire-format bytes
//! and releases them in batches once a flush threshold is crossed.

/// Default flush threshold: roughly 1.5 s of 8 kHz mono 8-bit audio.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 12_000;

/// Byte accumulator with threshold-gated flushing.
///
/// `try_flush` only releases data at or above the threshold; the sole
/// exception is `flush_remaining`, used when the stream terminates and
/// whatever is left must still reach the recognizer.
#[derive(Debug)]
pub struct AudioBuffer {
    data: Vec<u8>,
    threshold: usize,
}

impl AudioBuffer {
    pub fn new(threshold: usize) -> Self {
        Self {
            data: Vec::with_capacity(threshold),
            threshold,
        }
    }

    pub fn add(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Takes the full contents if the threshold has been reached,
    /// leaving the buffer empty. Returns `None` below threshold.
    pub fn try_flush(&mut self) -> Option<Vec<u8>> {
        if self.data.len() >= self.threshold {
            Some(std::mem::take(&mut self.data))
        } else {
            None
        }
    }

    /// Takes whatever is buffered regardless of the threshold. Only for
    /// stream termination, where partial audio would otherwise be lost.
    pub fn flush_remaining(&mut self) -> Option<Vec<u8>> {
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_below_threshold() {
        let mut buffer = AudioBuffer::new(100);
        buffer.add(&[0u8; 99]);
        assert!(buffer.try_flush().is_none());
        assert_eq!(buffer.len(), 99);
    }

    #[test]
    fn flushes_exactly_at_threshold() {
        let mut buffer = AudioBuffer::new(100);
        buffer.add(&[1u8; 100]);
        let flushed = buffer.try_flush().unwrap();
        assert_eq!(flushed.len(), 100);
        assert!(buffer.is_empty());
        // nothing left for a second flush
        assert!(buffer.try_flush().is_none());
    }

    #[test]
    fn flush_returns_everything_above_threshold() {
        let mut buffer = AudioBuffer::new(100);
        buffer.add(&[1u8; 60]);
        buffer.add(&[2u8; 60]);
        let flushed = buffer.try_flush().unwrap();
        assert_eq!(flushed.len(), 120);
        assert_eq!(&flushed[..60], &[1u8; 60]);
        assert_eq!(&flushed[60..], &[2u8; 60]);
    }

    #[test]
    fn accumulation_resumes_after_flush() {
        let mut buffer = AudioBuffer::new(10);
        buffer.add(&[1u8; 10]);
        assert!(buffer.try_flush().is_some());
        buffer.add(&[2u8; 5]);
        assert!(buffer.try_flush().is_none());
        buffer.add(&[2u8; 5]);
        assert_eq!(buffer.try_flush().unwrap(), vec![2u8; 10]);
    }

    #[test]
    fn flush_remaining_ignores_threshold() {
        let mut buffer = AudioBuffer::new(100);
        assert!(buffer.flush_remaining().is_none());
        buffer.add(&[3u8; 7]);
        assert_eq!(buffer.flush_remaining().unwrap(), vec![3u8; 7]);
        assert!(buffer.is_empty());
    }
}
