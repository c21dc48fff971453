//! Incremental sentence chunking for streaming synthesis.
//!
//! Generation tokens trickle in; synthesizing the full response at once
//! would add seconds of silence before the caller hears anything.
//! The chunker accumulates tokens and emits complete sentences as soon
//! as a terminator lands, so synthesis starts while the model is still
//! generating. A size threshold bounds latency when the model produces
//! a long run with no terminator at all.

/// Characters buffered before an unterminated sentence is flushed anyway.
pub const DEFAULT_MAX_BUFFER: usize = 160;

/// Splits a token stream into synthesizable sentence units.
#[derive(Debug)]
pub struct SentenceChunker {
    buffer: String,
    terminators: Vec<char>,
    max_buffer: usize,
}

impl SentenceChunker {
    pub fn new(language: &str) -> Self {
        Self::with_max_buffer(language, DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(language: &str, max_buffer: usize) -> Self {
        Self {
            buffer: String::new(),
            terminators: terminators_for(language),
            max_buffer,
        }
    }

    /// Feeds a token in and returns any sentence units it completed.
    pub fn push(&mut self, token: &str) -> Vec<String> {
        let mut units = Vec::new();
        for ch in token.chars() {
            self.buffer.push(ch);
            if self.terminators.contains(&ch) {
                self.take_unit(&mut units);
            } else if self.buffer.chars().count() >= self.max_buffer {
                self.take_unit(&mut units);
            }
        }
        units
    }

    /// Returns the unterminated remainder, if any. Call once the token
    /// stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    fn take_unit(&mut self, units: &mut Vec<String>) {
        let unit = std::mem::take(&mut self.buffer);
        let unit = unit.trim();
        if !unit.is_empty() {
            units.push(unit.to_string());
        }
    }
}

/// Sentence terminators for a BCP-47 language tag. `.!?` apply
/// everywhere; Devanagari danda for Hindi, fullwidth stops for Chinese
/// and Japanese.
fn terminators_for(language: &str) -> Vec<char> {
    let mut terminators = vec!['.', '!', '?'];
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
        .to_ascii_lowercase();
    match primary.as_str() {
        "hi" => terminators.extend(['\u{0964}', '\u{0965}']),
        "zh" | "ja" => terminators.extend(['\u{3002}', '\u{FF01}', '\u{FF1F}']),
        _ => {}
    }
    terminators
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_sentences_in_one_token() {
        let mut chunker = SentenceChunker::new("en-US");
        let units = chunker.push("One. Two! Three?");
        assert_eq!(units, vec!["One.", "Two!", "Three?"]);
        assert!(chunker.finish().is_none());
    }

    #[test]
    fn accumulates_across_tokens() {
        let mut chunker = SentenceChunker::new("en-US");
        assert!(chunker.push("Hel").is_empty());
        assert!(chunker.push("lo the").is_empty());
        let units = chunker.push("re. And");
        assert_eq!(units, vec!["Hello there."]);
        assert_eq!(chunker.finish().unwrap(), "And");
    }

    #[test]
    fn hindi_danda_terminates() {
        let mut chunker = SentenceChunker::new("hi-IN");
        let units = chunker.push("नमस्ते। कैसे हैं?");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0], "नमस्ते।");
    }

    #[test]
    fn fullwidth_stops_terminate_for_japanese() {
        let mut chunker = SentenceChunker::new("ja-JP");
        let units = chunker.push("こんにちは。元気？");
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn size_threshold_bounds_unterminated_runs() {
        let mut chunker = SentenceChunker::with_max_buffer("en-US", 10);
        let units = chunker.push("aaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].chars().count(), 10);
        assert_eq!(chunker.finish().unwrap(), "a");
    }

    #[test]
    fn whitespace_only_units_are_dropped() {
        let mut chunker = SentenceChunker::new("en-US");
        assert!(chunker.push("   ").is_empty());
        assert!(chunker.finish().is_none());

        let mut chunker = SentenceChunker::new("en-US");
        // terminator right after a flush leaves an empty unit behind
        let units = chunker.push("Done. ");
        assert_eq!(units, vec!["Done."]);
        assert!(chunker.finish().is_none());
    }
}
