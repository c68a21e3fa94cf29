use unicode_segmentation::UnicodeSegmentation;

use super::paragraph::split_at_word_boundary;

/// Aggregates sentences greedily up to `size` characters; a single
/// sentence longer than `size` falls back to a word-boundary split
/// so it never produces an oversize natural chunk.
pub fn natural_bounds(text: &str, size: usize) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let sentence_bounds = sentence_ranges(text);

    let mut bounds = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut current_end = 0;

    for (s_start, s_end) in sentence_bounds {
        if s_end - s_start > size {
            if let Some(start) = current_start.take() {
                bounds.push((start, current_end));
            }
            bounds.extend(split_at_word_boundary(&chars, s_start, s_end, size));
            continue;
        }

        match current_start {
            None => {
                current_start = Some(s_start);
                current_end = s_end;
            }
            Some(start) => {
                if s_end - start <= size {
                    current_end = s_end;
                } else {
                    bounds.push((start, current_end));
                    current_start = Some(s_start);
                    current_end = s_end;
                }
            }
        }
    }
    if let Some(start) = current_start {
        bounds.push((start, current_end));
    }
    bounds
}

/// Char-index ranges for each sentence, contiguous and covering the
/// whole text (the crate attaches trailing whitespace to the
/// preceding sentence).
pub(super) fn sentence_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut char_pos = 0;
    for sentence in text.unicode_sentences() {
        let len = sentence.chars().count();
        ranges.push((char_pos, char_pos + len));
        char_pos += len;
    }
    if ranges.is_empty() && !text.is_empty() {
        ranges.push((0, text.chars().count()));
    }
    ranges
}
