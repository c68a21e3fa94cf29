use super::ChunkSpan;

/// Given non-overlapping, contiguous `(start, end)` char-index bounds
/// covering the whole text, extends every span but the first
/// backward by `overlap` characters, then clips every span but the
/// last forward so its length stays at `size`. Because the bounds are
/// contiguous (`start_i == end_{i-1}`), a span's clipped end always
/// lands exactly on the next span's (extended) start, so the trailing
/// `overlap` characters of span `i-1` are byte-for-byte the leading
/// `overlap` characters of span `i` — except for the final span,
/// which is never clipped and so may not overlap its predecessor by
/// the full amount.
pub fn apply(text: &str, natural: Vec<(usize, usize)>, size: usize, overlap: usize) -> Vec<ChunkSpan> {
    let chars: Vec<char> = text.chars().collect();
    let last = natural.len().saturating_sub(1);
    natural
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| {
            let actual_start = if i == 0 { start } else { start.saturating_sub(overlap) };
            let actual_end = if i == last { end } else { end.min(actual_start + size) };
            ChunkSpan {
                text: chars[actual_start..actual_end].iter().collect(),
                start: actual_start,
                end: actual_end,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_spans_overlap_by_the_requested_amount() {
        let text = "abcdefghijklmnop";
        let natural = vec![(0, 6), (6, 12), (12, 16)];
        let spans = apply(text, natural, 6, 3);
        assert_eq!(spans[0].text, "abcdef");
        assert_eq!(spans[1].text, "defghi");
        assert_eq!(spans[2].text, "jklmnop");
    }

    #[test]
    fn non_final_spans_are_clipped_to_size() {
        let text = "x".repeat(1050);
        let natural = vec![(0, 512), (512, 1024), (1024, 1050)];
        let spans = apply(&text, natural, 512, 50);
        let lens: Vec<usize> = spans.iter().map(|s| s.text.chars().count()).collect();
        assert_eq!(lens, vec![512, 512, 76]);
    }
}
