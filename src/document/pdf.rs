use lopdf::Document;

use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Preserves paragraph breaks across pages by joining page text with
/// a blank line. Image-only PDFs legitimately extract to empty text;
/// that is not an error.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| CoreError::ValidationError(format!("invalid pdf: {e}")))?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    let mut text = String::new();

    for page_num in 1..=page_count as u32 {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(page_text.trim());
        }
    }

    Ok(ExtractedText {
        text,
        metadata: ExtractedMetadata {
            page_count: Some(page_count),
            sheet_names: Vec::new(),
        },
    })
}
