use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Re-delimits every row from comma to tab so downstream chunking
/// doesn't have to reason about quoting.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut text = String::new();
    for record in reader.records() {
        let record = record.map_err(|e| CoreError::ValidationError(format!("invalid csv: {e}")))?;
        let fields: Vec<&str> = record.iter().collect();
        text.push_str(&fields.join("\t"));
        text.push('\n');
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
    fn commas_are_re_delimited_to_tabs() {
        let extracted = extract(b"a,b,c\n1,2,3\n").unwrap();
        assert_eq!(extracted.text, "a\tb\tc\n1\t2\t3\n");
    }

    #[test]
    fn quoted_fields_keep_embedded_commas_intact() {
        let extracted = extract(b"\"hello, world\",2\n").unwrap();
        assert_eq!(extracted.text, "hello, world\t2\n");
    }

    #[test]
    fn ragged_rows_are_accepted_rather_than_rejected() {
        let extracted = extract(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(extracted.text, "a\tb\tc\n1\t2\n");
    }
}
