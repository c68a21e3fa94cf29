/// Exactly `size` characters per natural chunk, final chunk the
/// remainder.
pub fn natural_bounds(text: &str, size: usize) -> Vec<(usize, usize)> {
    let total = text.chars().count();
    let size = size.max(1);
    let mut bounds = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + size).min(total);
        bounds.push((start, end));
        start = end;
    }
    bounds
}
