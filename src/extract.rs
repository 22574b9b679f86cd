//! Plain-text extraction from uploaded documents (PDF, DOCX).
//!
//! Extraction is chosen by file extension. Each text block (the text of a
//! PDF, a Word paragraph, or a Word table cell) is whitespace-normalized,
//! empty blocks are dropped, and the remaining blocks are joined with `\n`.
//! Text boxes inside Word paragraphs are skipped.
//!
//! Scanned PDFs without a text layer extract to an empty string; OCR is not
//! attempted here.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use thiserror::Error;

use docchat_core::chunk::normalize_whitespace;

/// Extensions accepted by [`extract_text_from_file`], sorted.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".docx", ".pdf"];

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type '{extension}'. Supported types: {supported}")]
    UnsupportedFileType { extension: String, supported: String },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Lowercased extension of `file_name` including the leading dot, or an
/// empty string when there is none.
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn is_supported(file_name: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&file_extension(file_name).as_str())
}

/// Extract plain text from `bytes`, dispatching on the extension of
/// `file_name`.
pub fn extract_text_from_file(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    match file_extension(file_name).as_str() {
        ".pdf" => extract_text_from_pdf(bytes),
        ".docx" => extract_text_from_docx(bytes),
        other => Err(ExtractError::UnsupportedFileType {
            extension: other.to_string(),
            supported: SUPPORTED_EXTENSIONS.join(", "),
        }),
    }
}

pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let raw =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(normalize_whitespace(&raw))
}

/// Body paragraphs first, then every table cell, in document order.
pub fn extract_text_from_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    let (paragraphs, cells) = read_document_xml(&doc_xml)?;
    Ok(join_blocks(paragraphs.iter().chain(cells.iter())))
}

/// Walk `word/document.xml`, splitting text into body paragraphs and table
/// cells. Paragraphs inside a table belong to their (outermost) cell.
fn read_document_xml(xml: &[u8]) -> Result<(Vec<String>, Vec<String>), ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut cells = Vec::new();

    let mut paragraph = String::new();
    let mut cell: Option<String> = None;
    let mut cell_depth = 0usize;
    let mut text_box_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"txbxContent" => {
                text_box_depth += 1;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"txbxContent" => {
                text_box_depth = text_box_depth.saturating_sub(1);
            }
            // Paragraphs inside a text box do not belong to the enclosing one.
            Ok(Event::Start(_)) | Ok(Event::End(_)) | Ok(Event::Empty(_)) | Ok(Event::Text(_))
                if text_box_depth > 0 => {}
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => paragraph.clear(),
                b"tc" => {
                    if cell_depth == 0 {
                        cell = Some(String::new());
                    }
                    cell_depth += 1;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" | b"br" | b"cr" => paragraph.push(' '),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = std::mem::take(&mut paragraph);
                    match cell.as_mut() {
                        Some(cell_text) => {
                            cell_text.push_str(&text);
                            cell_text.push('\n');
                        }
                        None => paragraphs.push(text),
                    }
                }
                b"tc" => {
                    cell_depth = cell_depth.saturating_sub(1);
                    if cell_depth == 0 {
                        if let Some(cell_text) = cell.take() {
                            cells.push(cell_text);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok((paragraphs, cells))
}

fn join_blocks<I, S>(blocks: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    blocks
        .into_iter()
        .map(|block| normalize_whitespace(block.as_ref()))
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
