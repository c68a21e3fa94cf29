use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Renders markdown to plain text: headings and paragraphs become
/// lines, code blocks are kept verbatim, inline markup is dropped.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let markdown = String::from_utf8_lossy(bytes);
    let parser = Parser::new(&markdown);

    let mut text = String::new();
    for event in parser {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                text.push('\n');
            }
            Event::Start(Tag::Heading { .. }) => {}
            _ => {}
        }
    }

    Ok(ExtractedText {
        text,
        metadata: ExtractedMetadata::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_paragraphs_become_plain_lines() {
        let extracted = extract(b"# Title\n\nBody text.\n").unwrap();
        assert!(extracted.text.contains("Title"));
        assert!(extracted.text.contains("Body text."));
        assert!(!extracted.text.contains('#'));
    }

    #[test]
    fn inline_emphasis_markup_is_dropped() {
        let extracted = extract(b"some **bold** and *italic* text").unwrap();
        assert!(extracted.text.contains("bold"));
        assert!(extracted.text.contains("italic"));
        assert!(!extracted.text.contains('*'));
    }
}
