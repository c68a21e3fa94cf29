use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};

use super::{ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

/// Tables are flattened to tab-delimited rows, one row per line,
/// interleaved with paragraph text in document order.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let docx = read_docx(bytes).map_err(|e| CoreError::ValidationError(format!("invalid docx: {e}")))?;

    let mut text = String::new();
    for child in docx.document.children {
        match child {
            DocumentChild::Paragraph(para) => {
                for child in para.children {
                    if let ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
            DocumentChild::Table(table) => {
                for row in table.rows {
                    let TableChild::TableRow(row) = row;
                    let mut cells = Vec::new();
                    for cell in row.cells {
                        let TableRowChild::TableCell(cell) = cell;
                        let mut cell_text = String::new();
                        for content in cell.children {
                            if let TableCellContent::Paragraph(para) = content {
                                for child in para.children {
                                    if let ParagraphChild::Run(run) = child {
                                        for child in run.children {
                                            if let RunChild::Text(t) = child {
                                                cell_text.push_str(&t.text);
                                            }
                                        }
                                    }
                                }
                            }
                        }
                        cells.push(cell_text);
                    }
                    text.push_str(&cells.join("\t"));
                    text.push('\n');
                }
            }
            _ => {}
        }
    }

    Ok(ExtractedText {
        text,
        metadata: ExtractedMetadata::default(),
    })
}
