/// One paragraph (text between `\n\n` separators) per natural chunk;
/// paragraphs longer than `size` are split further at word
/// boundaries so no text is dropped.
pub fn natural_bounds(text: &str, size: usize) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let ranges = paragraph_ranges(&chars);

    let mut bounds = Vec::new();
    for (start, end) in ranges {
        if end - start <= size {
            bounds.push((start, end));
        } else {
            bounds.extend(split_at_word_boundary(&chars, start, end, size));
        }
    }
    bounds
}

/// Contiguous `(start, end)` ranges with `\n\n` separators excluded;
/// a paragraph's range ends where the separator begins, and the next
/// paragraph begins right after it, so concatenating every range's
/// text reconstructs the input up to separator whitespace.
pub(super) fn paragraph_ranges(chars: &[char]) -> Vec<(usize, usize)> {
    let total = chars.len();
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < total {
        if chars[i] == '\n' && chars[i + 1] == '\n' {
            ranges.push((start, i));
            i += 2;
            start = i;
        } else {
            i += 1;
        }
    }
    ranges.push((start, total));
    ranges
}

/// Greedily cuts `[start, end)` into pieces of at most `size`
/// characters, preferring to break at the last whitespace within the
/// window; falls back to a hard cut when the window has no
/// whitespace (e.g. one very long token).
pub(super) fn split_at_word_boundary(chars: &[char], start: usize, end: usize, size: usize) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut s = start;
    while s < end {
        let hard_end = (s + size).min(end);
        if hard_end >= end {
            bounds.push((s, end));
            break;
        }
        let mut cut = hard_end;
        let mut j = hard_end;
        while j > s + 1 {
            if chars[j - 1].is_whitespace() {
                cut = j - 1;
                break;
            }
            j -= 1;
        }
        bounds.push((s, cut));
        s = cut;
    }
    bounds
}
