use std::io::Cursor;

use calamine::{open_workbook_from_rs, Reader, Xlsx};

use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Each sheet becomes a `\n\n# <sheet name>\n` header followed by
/// tab-delimited rows, preserving sheet boundaries in the flattened
/// output.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let cursor = Cursor::new(bytes);
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(cursor).map_err(|e| CoreError::ValidationError(format!("invalid xlsx: {e}")))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut text = String::new();

    for name in &sheet_names {
        let Ok(range) = workbook.worksheet_range(name) else {
            continue;
        };
        text.push_str("\n\n# ");
        text.push_str(name);
        text.push('\n');
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            text.push_str(&cells.join("\t"));
            text.push('\n');
        }
    }

    Ok(ExtractedText {
        text: text.trim_start().to_string(),
        metadata: ExtractedMetadata {
            page_count: None,
            sheet_names,
        },
    })
}
