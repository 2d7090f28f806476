//! Text extraction for corpus files (PDF, DOCX, plain text) and
//! normalisation of the extracted text.
//!
//! Extraction never panics: a failure is returned as [`ExtractError`] and
//! the document loader skips the file.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use thiserror::Error;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("file is not valid UTF-8 text")]
    NotUtf8,
}

/// How a file's bytes are turned into text, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Docx,
    PlainText,
}

impl ContentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => ContentKind::Pdf,
            "docx" => ContentKind::Docx,
            _ => ContentKind::PlainText,
        }
    }
}

/// Extract and clean the text of one file's bytes.
pub fn extract_text(bytes: &[u8], kind: ContentKind) -> Result<String, ExtractError> {
    let raw = match kind {
        ContentKind::Pdf => extract_pdf(bytes)?,
        ContentKind::Docx => extract_docx(bytes)?,
        ContentKind::PlainText => {
            String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotUtf8)?
        }
    };
    Ok(clean_text(&raw))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked on malformed input".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    docx_paragraphs(&xml)
}

/// Collect `<w:t>` runs, ending each `<w:p>` paragraph with a blank line.
fn docx_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Normalise extracted text.
///
/// Drops NUL characters, collapses runs of spaces and tabs, trims every
/// line, collapses three or more newlines into one paragraph break, and
/// trims the result.
pub fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut newlines = 0usize;

    for line in raw.replace('\0', "").replace("\r\n", "\n").split('\n') {
        let collapsed = line
            .split([' ', '\t'])
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if collapsed.is_empty() {
            newlines += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if newlines >= 1 { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        newlines = 0;
    }
    out
}
