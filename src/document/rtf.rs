use rtf_parser::document::RtfDocument;

use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Control words are stripped by the parser itself; only the plain
/// run text is kept.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let rtf = String::from_utf8_lossy(bytes);
    let doc = RtfDocument::try_from(rtf.as_ref())
        .map_err(|e| CoreError::ValidationError(format!("invalid rtf: {e:?}")))?;

    let text = doc
        .get_text()
        .trim()
        .to_string();

    Ok(ExtractedText {
        text,
        metadata: ExtractedMetadata::default(),
    })
}
