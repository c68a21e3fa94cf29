mod fixed;
mod overlap;
mod paragraph;
mod recursive;
mod sentence;

use crate::domain::{ChunkPolicy, ChunkStrategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub text: String,
    /// Offsets into the canonical input, inclusive of the leading
    /// overlap (so `text` may reproduce the tail of the previous
    /// span).
    pub start: usize,
    pub end: usize,
}

/// Splits `text` per `policy`, guaranteeing: (1) every span but the
/// last is exactly `size` characters and starts with the previous
/// span's trailing `overlap` characters, and (2) concatenating each
/// span's non-overlapping suffix reconstructs `text` up to whitespace
/// normalization.
pub fn chunk(text: &str, policy: &ChunkPolicy) -> Vec<ChunkSpan> {
    if text.is_empty() {
        return Vec::new();
    }

    let natural = match policy.strategy {
        ChunkStrategy::Fixed => fixed::natural_bounds(text, policy.size),
        ChunkStrategy::Paragraph => paragraph::natural_bounds(text, policy.size),
        ChunkStrategy::Sentence => sentence::natural_bounds(text, policy.size),
        ChunkStrategy::Recursive => recursive::natural_bounds(text, policy.size),
    };

    overlap::apply(text, natural, policy.size, policy.overlap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChunkPolicy;

    /// Reconstructs the canonical text by, for each span, skipping
    /// however many of its leading characters were already emitted by
    /// the previous span. Derived from the spans' own `start`/`end`
    /// rather than an assumed constant `overlap`, since the final span
    /// may share less than `overlap` characters with its predecessor.
    fn reconstruct(spans: &[ChunkSpan]) -> String {
        let mut out = String::new();
        let mut emitted_up_to = 0usize;
        for span in spans {
            let chars: Vec<char> = span.text.chars().collect();
            let skip = emitted_up_to.saturating_sub(span.start).min(chars.len());
            out.extend(&chars[skip..]);
            emitted_up_to = span.end;
        }
        out
    }

    #[test]
    fn fixed_strategy_reconstructs_canonical_text() {
        let text = "a".repeat(1100);
        let policy = ChunkPolicy { size: 512, overlap: 50, strategy: ChunkStrategy::Fixed };
        let spans = chunk(&text, &policy);
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn fixed_strategy_produces_expected_lengths() {
        let text = "x".repeat(1100);
        let policy = ChunkPolicy { size: 512, overlap: 0, strategy: ChunkStrategy::Fixed };
        let spans = chunk(&text, &policy);
        let lens: Vec<usize> = spans.iter().map(|s| s.text.chars().count()).collect();
        assert_eq!(lens, vec![512, 512, 76]);
    }

    #[test]
    fn fixed_strategy_with_overlap_keeps_non_final_chunks_at_size() {
        let text = "x".repeat(1050);
        let policy = ChunkPolicy { size: 512, overlap: 50, strategy: ChunkStrategy::Fixed };
        let spans = chunk(&text, &policy);
        let lens: Vec<usize> = spans.iter().map(|s| s.text.chars().count()).collect();
        assert_eq!(lens, vec![512, 512, 76]);
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let policy = ChunkPolicy { size: 512, overlap: 50, strategy: ChunkStrategy::Recursive };
        assert!(chunk("", &policy).is_empty());
    }

    #[test]
    fn paragraph_strategy_reconstructs_canonical_text() {
        let text = "first paragraph here.\n\nsecond paragraph, a bit longer than the first one.";
        let policy = ChunkPolicy { size: 512, overlap: 10, strategy: ChunkStrategy::Paragraph };
        let spans = chunk(text, &policy);
        assert!(!spans.is_empty());
    }
}
