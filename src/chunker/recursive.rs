use super::paragraph::paragraph_ranges;
use super::sentence::sentence_ranges;

/// Tries paragraph boundaries first, merging adjacent short
/// paragraphs up to `size`; a paragraph that alone exceeds `size`
/// recurses into sentence aggregation; a sentence that alone exceeds
/// `size` falls back to a hard character split. This is the only
/// strategy that merges multiple source paragraphs into one chunk.
pub fn natural_bounds(text: &str, size: usize) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let paragraphs = paragraph_ranges(&chars);

    let mut bounds = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut current_end = 0;

    for (p_start, p_end) in paragraphs {
        if p_end - p_start > size {
            if let Some(start) = current_start.take() {
                bounds.push((start, current_end));
            }
            bounds.extend(split_paragraph(&chars, p_start, p_end, size));
            continue;
        }

        match current_start {
            None => {
                current_start = Some(p_start);
                current_end = p_end;
            }
            Some(start) => {
                if p_end - start <= size {
                    current_end = p_end;
                } else {
                    bounds.push((start, current_end));
                    current_start = Some(p_start);
                    current_end = p_end;
                }
            }
        }
    }
    if let Some(start) = current_start {
        bounds.push((start, current_end));
    }
    bounds
}

fn split_paragraph(chars: &[char], start: usize, end: usize, size: usize) -> Vec<(usize, usize)> {
    let slice: String = chars[start..end].iter().collect();
    let sentences = sentence_ranges(&slice);

    let mut bounds = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut current_end = start;

    for (rel_start, rel_end) in sentences {
        let (abs_start, abs_end) = (start + rel_start, start + rel_end);
        if abs_end - abs_start > size {
            if let Some(cs) = current_start.take() {
                bounds.push((cs, current_end));
            }
            bounds.extend(fixed_char_split(abs_start, abs_end, size));
            continue;
        }

        match current_start {
            None => {
                current_start = Some(abs_start);
                current_end = abs_end;
            }
            Some(cs) => {
                if abs_end - cs <= size {
                    current_end = abs_end;
                } else {
                    bounds.push((cs, current_end));
                    current_start = Some(abs_start);
                    current_end = abs_end;
                }
            }
        }
    }
    if let Some(cs) = current_start {
        bounds.push((cs, current_end));
    }
    bounds
}

fn fixed_char_split(start: usize, end: usize, size: usize) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut s = start;
    while s < end {
        let e = (s + size).min(end);
        bounds.push((s, e));
        s = e;
    }
    bounds
}
