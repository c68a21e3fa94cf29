use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::Event as XmlEvent;
use quick_xml::reader::Reader as XmlReader;
use zip::ZipArchive;

use super::{html, ExtractedMetadata, ExtractedText};
use crate::utils::CoreError;

fn invalid(what: &str) -> CoreError {
    CoreError::ValidationError(format!("invalid epub: {what}"))
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>, CoreError> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| invalid(&format!("missing entry {name}")))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|e| invalid(&e.to_string()))?;
    Ok(buf)
}

/// Finds the package document path via `META-INF/container.xml`.
fn find_rootfile(container_xml: &[u8]) -> Result<String, CoreError> {
    let mut reader = XmlReader::from_reader(container_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| invalid(&e.to_string()))? {
            XmlEvent::Empty(e) | XmlEvent::Start(e) if e.local_name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"full-path" {
                        return Ok(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Err(invalid("container.xml has no rootfile"))
}

/// Parses the OPF package document: manifest (`id -> href`) and the
/// spine's ordered `idref` list.
fn parse_opf(opf: &[u8]) -> Result<(HashMap<String, String>, Vec<String>), CoreError> {
    let mut reader = XmlReader::from_reader(opf);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut manifest = HashMap::new();
    let mut spine = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| invalid(&e.to_string()))? {
            XmlEvent::Empty(e) | XmlEvent::Start(e) => {
                match e.local_name().as_ref() {
                    b"item" => {
                        let mut id = None;
                        let mut href = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.local_name().as_ref() {
                                b"id" => id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                                b"href" => href = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                                _ => {}
                            }
                        }
                        if let (Some(id), Some(href)) = (id, href) {
                            manifest.insert(id, href);
                        }
                    }
                    b"itemref" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.local_name().as_ref() == b"idref" {
                                spine.push(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }
                    _ => {}
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((manifest, spine))
}

/// Concatenates spine chapters in reading order, stripping each
/// chapter's XHTML markup.
pub fn extract(bytes: &[u8]) -> Result<ExtractedText, CoreError> {
    let cursor = Cursor::new(bytes);
    let mut archive = ZipArchive::new(cursor).map_err(|e| invalid(&e.to_string()))?;

    let container = read_entry(&mut archive, "META-INF/container.xml")?;
    let rootfile = find_rootfile(&container)?;
    let opf = read_entry(&mut archive, &rootfile)?;
    let (manifest, spine) = parse_opf(&opf)?;

    let base_dir = rootfile.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");

    let mut text = String::new();
    for idref in &spine {
        let Some(href) = manifest.get(idref) else { continue };
        let path = if base_dir.is_empty() {
            href.clone()
        } else {
            format!("{base_dir}/{href}")
        };
        let Ok(chapter_bytes) = read_entry(&mut archive, &path) else {
            continue;
        };
        let chapter = html::extract(&chapter_bytes)?;
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&chapter.text);
    }

    Ok(ExtractedText {
        text,
        metadata: ExtractedMetadata::default(),
    })
}
