use scraper::{Html, Selector};

use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Strips `<script>`/`<style>` blocks and collapses runs of
/// whitespace to a single space.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let html = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&html);

    let skip_selector = Selector::parse("script, style").unwrap();
    let skip_nodes: std::collections::HashSet<_> = document
        .select(&skip_selector)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let mut text = String::new();
    for node in document.root_element().descendants() {
        if skip_nodes.contains(&node.id()) {
            continue;
        }
        if let Some(t) = node.value().as_text() {
            text.push_str(t);
            text.push(' ');
        }
    }

    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    Ok(ExtractedText {
        text: normalized,
        metadata: ExtractedMetadata::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_and_style_bodies_are_excluded() {
        let extracted = extract(b"<html><head><style>.a{color:red}</style></head><body><script>alert(1)</script><p>hello</p></body></html>").unwrap();
        assert_eq!(extracted.text, "hello");
    }

    #[test]
    fn whitespace_runs_collapse_to_a_single_space() {
        let extracted = extract(b"<p>hello\n\n   world</p>").unwrap();
        assert_eq!(extracted.text, "hello world");
    }
}
