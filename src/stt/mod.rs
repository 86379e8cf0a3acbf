//! Speech-to-text backends and the fallback adapter

pub mod adapter;
pub mod engine;

pub use adapter::{is_degenerate, FallbackTranscriber, Transcriber};
pub use engine::WhisperEngine;

/// One timed span of transcribed text. Timestamps may be absent; callers
/// substitute the enclosing slice bounds instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_sec: Option<f64>,
    pub end_sec: Option<f64>,
}

/// Transcription of one audio slice, combinable by concatenation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptResult {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

impl TranscriptResult {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.segments.is_empty()
    }

    /// Append another result: texts joined with a single space (both
    /// sides trimmed), segment order preserved.
    pub fn append(&mut self, other: TranscriptResult) {
        let addition = other.text.trim();
        if !addition.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(addition);
        }
        self.segments.extend(other.segments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            start_sec: Some(start),
            end_sec: Some(end),
        }
    }

    #[test]
    fn test_append_trims_and_preserves_order() {
        let mut combined = TranscriptResult {
            text: "A ".trim().to_string(),
            segments: vec![span("A", 0.0, 1.0)],
        };
        combined.append(TranscriptResult {
            text: "B ".to_string(),
            segments: vec![span("B", 1.0, 2.0)],
        });

        assert_eq!(combined.text, "A B");
        assert_eq!(combined.segments.len(), 2);
        assert_eq!(combined.segments[0].text, "A");
        assert_eq!(combined.segments[1].text, "B");
    }

    #[test]
    fn test_append_empty_text_keeps_segments() {
        let mut combined = TranscriptResult::default();
        combined.append(TranscriptResult {
            text: "   ".to_string(),
            segments: vec![span("x", 0.0, 1.0)],
        });

        assert_eq!(combined.text, "");
        assert_eq!(combined.segments.len(), 1);
    }
}
