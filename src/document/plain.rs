use encoding_rs::UTF_8;

use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Plain text is decoded as UTF-8 with lossy replacement rather than
/// rejected outright; most "plain text" uploads in practice carry no
/// declared encoding at all.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if had_errors {
        tracing::debug!("plain text upload contained invalid utf-8 sequences, replaced lossily");
    }

    Ok(ExtractedText {
        text: text.into_owned(),
        metadata: ExtractedMetadata::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_passes_through_unchanged() {
        let extracted = extract("hello world".as_bytes()).unwrap();
        assert_eq!(extracted.text, "hello world");
    }

    #[test]
    fn invalid_utf8_is_replaced_lossily_rather_than_rejected() {
        let extracted = extract(&[0x68, 0x69, 0xff, 0xfe]).unwrap();
        assert!(extracted.text.starts_with("hi"));
        assert!(extracted.text.contains('\u{FFFD}'));
    }
}
