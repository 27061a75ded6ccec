use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Comment marker some filings carry ahead of the root element; it breaks
/// downstream consumers and is removed before extraction.
pub const MARKER_COMMENT: &str = "FRIndAs";

/// Read a filing document, honouring a BOM when the download carried one.
pub fn read_document(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open filing: {}", path.display()))?;
    let mut reader = encoding_rs_io::DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding_rs::UTF_8))
        .build(file);
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .with_context(|| format!("failed to decode filing: {}", path.display()))?;
    Ok(content)
}

/// Strip the known marker comment, rewriting the file in place. Runs once
/// per document before extraction; a no-op when the marker is absent, so
/// reprocessing an already-edited document always succeeds.
pub fn strip_marker_comment(path: &Path) -> Result<bool> {
    let content = read_document(path)?;

    let mut reader = Reader::from_str(&content);
    let mut writer = Writer::new(Vec::new());
    let mut removed = false;

    loop {
        match reader.read_event() {
            Ok(Event::Comment(e)) if String::from_utf8_lossy(&e).trim() == MARKER_COMMENT => {
                removed = true;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => {
                return Err(anyhow!(
                    "error editing filing {}: {}",
                    path.display(),
                    e
                ))
            }
        }
    }

    if removed {
        fs::write(path, writer.into_inner())?;
    }
    Ok(removed)
}

/// Parse the filing into an element tree. A non-well-formed document is
/// fatal for this one filing; the per-file loop catches and logs it.
pub fn parse_document(content: &str) -> Result<roxmltree::Document<'_>> {
    roxmltree::Document::parse(content)
        .map_err(|e| anyhow!("malformed filing document: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKED: &str =
        "<xbrl><!--FRIndAs--><ScripCode contextRef=\"OneD\">500325</ScripCode></xbrl>";

    #[test]
    fn test_strip_marker_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filing.xml");
        fs::write(&path, MARKED).unwrap();

        assert!(strip_marker_comment(&path).unwrap());
        let edited = fs::read_to_string(&path).unwrap();
        assert!(!edited.contains(MARKER_COMMENT));
        assert!(edited.contains("500325"));
        parse_document(&edited).unwrap();
    }

    #[test]
    fn test_strip_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filing.xml");
        fs::write(&path, MARKED).unwrap();

        assert!(strip_marker_comment(&path).unwrap());
        let after_first = fs::read_to_string(&path).unwrap();
        // marker already gone: must not fail, must not rewrite
        assert!(!strip_marker_comment(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
    }

    #[test]
    fn test_other_comments_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filing.xml");
        fs::write(&path, "<xbrl><!-- audited --><a>1</a></xbrl>").unwrap();

        assert!(!strip_marker_comment(&path).unwrap());
        assert!(fs::read_to_string(&path).unwrap().contains("audited"));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(parse_document("<xbrl><unclosed>").is_err());
    }

    #[test]
    fn test_read_document_skips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.xml");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<xbrl/>");
        fs::write(&path, bytes).unwrap();
        assert_eq!(read_document(&path).unwrap(), "<xbrl/>");
    }
}
