//! Document loading across the supported file formats.
//!
//! Fixtures are built in memory: a hand-assembled single-page PDF and a
//! minimal DOCX zip holding only `word/document.xml`.

use std::fs;
use std::io::Write;
use std::path::Path;

use skincare_rag::config::DocumentsConfig;
use skincare_rag::documents::{scan_documents, FsDocumentSource};
use skincare_rag::corpus::DocumentSource;
use tempfile::TempDir;

/// Minimal PDF with one text run, `phrase`.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal docx with one `<w:p>` per entry of `paragraphs`.
fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn docs_config(root: &Path) -> DocumentsConfig {
    DocumentsConfig {
        root: root.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn test_docx_paragraphs_are_extracted() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("guide.docx"),
        minimal_docx(&["Use a gentle cleanser.", "Apply sunscreen daily."]),
    )
    .unwrap();

    let docs = scan_documents(&docs_config(tmp.path())).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source_id, "guide.docx");
    assert_eq!(docs[0].text, "Use a gentle cleanser.\n\nApply sunscreen daily.");
}

#[test]
fn test_pdf_text_is_extracted() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("acne.pdf"),
        minimal_pdf_with_phrase("salicylic acid for acne"),
    )
    .unwrap();

    let docs = scan_documents(&docs_config(tmp.path())).unwrap();
    assert_eq!(docs.len(), 1);
    assert!(docs[0].text.contains("salicylic acid for acne"));
}

#[test]
fn test_broken_files_are_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("broken.pdf"), b"not a pdf").unwrap();
    fs::write(tmp.path().join("broken.docx"), b"not a zip").unwrap();
    fs::write(tmp.path().join("empty.txt"), "  \n\n  ").unwrap();
    fs::write(tmp.path().join("notes.md"), "Niacinamide reduces redness.").unwrap();

    let docs = scan_documents(&docs_config(tmp.path())).unwrap();
    let ids: Vec<&str> = docs.iter().map(|d| d.source_id.as_str()).collect();
    assert_eq!(ids, vec!["notes.md"]);
}

#[test]
fn test_nested_documents_keep_relative_ids_in_order() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("derm/acne")).unwrap();
    fs::write(tmp.path().join("derm/acne/b.txt"), "benzoyl peroxide").unwrap();
    fs::write(tmp.path().join("a.txt"), "azelaic acid").unwrap();
    fs::write(tmp.path().join("ignored.csv"), "x,y").unwrap();

    let docs = scan_documents(&docs_config(tmp.path())).unwrap();
    let ids: Vec<&str> = docs.iter().map(|d| d.source_id.as_str()).collect();
    assert_eq!(ids, vec!["a.txt", "derm/acne/b.txt"]);
}

#[tokio::test]
async fn test_fs_source_reports_missing_root() {
    let tmp = TempDir::new().unwrap();
    let source = FsDocumentSource::new(docs_config(&tmp.path().join("nope")));
    let err = source.load_documents().await.unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}
