use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// JSON is kept verbatim; only UTF-8 validity and well-formedness are
/// checked.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let text = String::from_utf8(bytes.to_vec())
        .map_err(|e| CoreError::ValidationError(format!("invalid utf-8: {e}")))?;
    serde_json::from_str::<serde_json::Value>(&text)
        .map_err(|e| CoreError::ValidationError(format!("invalid json: {e}")))?;

    Ok(ExtractedText {
        text,
        metadata: ExtractedMetadata::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_json_is_kept_verbatim() {
        let extracted = extract(br#"{"a": 1}"#).unwrap();
        assert_eq!(extracted.text, r#"{"a": 1}"#);
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = extract(b"{not json}").unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }
}
