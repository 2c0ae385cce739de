//! Text extraction from office documents (OOXML, ODF, PDF).

use std::fs::File;
use std::io::Read;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::context::{ContextError, SourceKind, classify_io};

/// Extracts the readable text of one office document. Speaker notes are
/// ignored and the extractor emits no diagnostics of its own.
pub(crate) fn extract_text(path: &str, kind: SourceKind) -> Result<String, ContextError> {
    match kind {
        SourceKind::Pdf => extract_pdf(path),
        SourceKind::Docx => archive_part_text(path, "word/document.xml", true),
        SourceKind::Xlsx => archive_part_text(path, "xl/sharedStrings.xml", false),
        SourceKind::Pptx => extract_pptx(path),
        SourceKind::Odt | SourceKind::Odp | SourceKind::Ods => {
            archive_part_text(path, "content.xml", true)
        }
        SourceKind::Txt | SourceKind::Html => Err(ContextError::Extraction {
            source: path.to_string(),
            detail: format!("'{}' is not an office document type", kind.as_str()),
        }),
    }
}

fn extract_pdf(path: &str) -> Result<String, ContextError> {
    // Probe the file first so missing/unreadable paths classify as IO
    // failures rather than parser failures.
    File::open(path).map_err(|cause| classify_io(path, cause))?;

    pdf_extract::extract_text(path).map_err(|cause| ContextError::Extraction {
        source: path.to_string(),
        detail: cause.to_string(),
    })
}

/// Reads one XML part out of a zip archive and returns its text nodes.
/// When `required` is false a missing part yields an empty string (an xlsx
/// with no shared strings, for example).
fn archive_part_text(path: &str, part: &str, required: bool) -> Result<String, ContextError> {
    let file = File::open(path).map_err(|cause| classify_io(path, cause))?;
    let mut archive = ZipArchive::new(file).map_err(|cause| classify_zip(path, cause))?;

    let xml = match read_part(&mut archive, part) {
        Ok(xml) => xml,
        Err(ZipError::FileNotFound) if !required => return Ok(String::new()),
        Err(cause) => return Err(classify_zip(path, cause)),
    };

    xml_text(&xml).map_err(|cause| ContextError::Extraction {
        source: path.to_string(),
        detail: cause.to_string(),
    })
}

fn extract_pptx(path: &str) -> Result<String, ContextError> {
    let file = File::open(path).map_err(|cause| classify_io(path, cause))?;
    let mut archive = ZipArchive::new(file).map_err(|cause| classify_zip(path, cause))?;

    // Slide parts in slide-number order. Notes live under ppt/notesSlides/
    // and never match this prefix.
    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .filter_map(|name| {
            let number: usize = name
                .trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    let mut out = String::new();
    for (_, name) in slides {
        let xml = read_part(&mut archive, &name).map_err(|cause| classify_zip(path, cause))?;
        let text = xml_text(&xml).map_err(|cause| ContextError::Extraction {
            source: path.to_string(),
            detail: cause.to_string(),
        })?;
        out.push_str(&text);
        out.push(' ');
    }
    Ok(out)
}

fn read_part(archive: &mut ZipArchive<File>, part: &str) -> Result<String, ZipError> {
    let mut entry = archive.by_name(part)?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(ZipError::Io)?;
    Ok(xml)
}

fn classify_zip(path: &str, cause: ZipError) -> ContextError {
    match cause {
        ZipError::Io(io) => classify_io(path, io),
        other => ContextError::Extraction {
            source: path.to_string(),
            detail: other.to_string(),
        },
    }
}

/// Collects the text nodes of an XML document, one space between nodes.
/// `presentation:notes` subtrees (ODP speaker notes) are skipped.
fn xml_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) if start.name().as_ref() == b"presentation:notes" => {
                reader.read_to_end(start.name())?;
            }
            Event::Text(text) => {
                let value = text.xml_content()?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    out.push_str(trimmed);
                    out.push(' ');
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_text_collects_text_nodes_with_word_boundaries() {
        let xml = "<w:document><w:p><w:r><w:t>Hello,</w:t></w:r><w:r><w:t>World!</w:t></w:r></w:p></w:document>";
        assert_eq!(xml_text(xml).unwrap(), "Hello, World! ");
    }

    #[test]
    fn xml_text_skips_whitespace_only_nodes_and_unescapes_entities() {
        let xml = "<doc>\n  <t>a &amp; b</t>\n</doc>";
        assert_eq!(xml_text(xml).unwrap(), "a & b ");
    }

    #[test]
    fn xml_text_ignores_presentation_notes_subtrees() {
        let xml = concat!(
            "<office:presentation>",
            "<draw:page><text:p>slide text</text:p>",
            "<presentation:notes><text:p>speaker notes</text:p></presentation:notes>",
            "</draw:page>",
            "</office:presentation>",
        );
        assert_eq!(xml_text(xml).unwrap(), "slide text ");
    }

    #[test]
    fn missing_file_classifies_as_not_found_before_extraction() {
        let err = extract_text("/nonexistent/orq-test.docx", SourceKind::Docx).unwrap_err();
        assert!(matches!(err, ContextError::NotFound { .. }));

        let err = extract_text("/nonexistent/orq-test.pdf", SourceKind::Pdf).unwrap_err();
        assert!(matches!(err, ContextError::NotFound { .. }));
    }

    #[test]
    fn non_archive_file_classifies_as_extraction_failure() {
        let path = std::env::temp_dir().join("orq-office-not-a-zip");
        std::fs::write(&path, "plain text, not a zip archive").unwrap();

        let err =
            extract_text(path.to_string_lossy().as_ref(), SourceKind::Docx).unwrap_err();
        assert!(matches!(err, ContextError::Extraction { .. }));

        std::fs::remove_file(path).ok();
    }
}
