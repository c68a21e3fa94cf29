mod csv;
mod docx;
mod epub;
mod html;
mod json;
mod markdown;
mod mime;
mod pdf;
mod plain;
mod rtf;
mod xlsx;

use crate::utils::CoreError;

pub use mime::sniff_and_validate;

/// Accepted MIME hints; anything else is rejected with `validation_error`
/// before a byte is read.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct ExtractedMetadata {
    pub page_count: Option<usize>,
    pub sheet_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub metadata: ExtractedMetadata,
}

/// Dispatches on the (validated) MIME type to the matching
/// format-specific extractor. OCR is never performed; image-only
/// PDFs legitimately yield empty text.
pub fn extract(bytes: &[u8], mime_type: &str) -> Result<ExtractedText, CoreError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(CoreError::PayloadTooLarge(format!(
            "{} bytes exceeds the {} byte limit",
            bytes.len(),
            MAX_UPLOAD_BYTES
        )));
    }

    match mime_type {
        "application/pdf" => pdf::extract(bytes),
        "text/plain" => plain::extract(bytes),
        "text/markdown" => markdown::extract(bytes),
        "text/html" => html::extract(bytes),
        "text/csv" => csv::extract(bytes),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            docx::extract(bytes)
        }
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            xlsx::extract(bytes)
        }
        "application/rtf" => rtf::extract(bytes),
        "application/epub+zip" => epub::extract(bytes),
        "application/json" => json::extract(bytes),
        other => Err(CoreError::ValidationError(format!(
            "unsupported mime type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_payload_is_rejected_before_dispatch() {
        let bytes = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let err = extract(&bytes, "text/plain").unwrap_err();
        assert!(matches!(err, CoreError::PayloadTooLarge(_)));
    }

    #[test]
    fn unsupported_mime_type_is_rejected() {
        let err = extract(b"anything", "application/octet-stream").unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn plain_text_dispatches_to_the_plain_extractor() {
        let extracted = extract(b"hello", "text/plain").unwrap();
        assert_eq!(extracted.text, "hello");
    }
}
