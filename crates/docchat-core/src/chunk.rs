//! Fixed-size, overlapping word-window chunker.
//!
//! Splits extracted document text into [`Chunk`]s of `chunk_size` words,
//! where consecutive windows share `chunk_overlap` words. Chunk ids are
//! derived from a slug of the source name plus a 1-based position, so
//! re-chunking the same text always yields the same ids.
//!
//! # Algorithm
//!
//! 1. Split text on whitespace into words.
//! 2. Start a window every `chunk_size - chunk_overlap` words.
//! 3. Join each window's words with single spaces.
//! 4. Stop after the first window that reaches the last word.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::chunk::build_chunks_from_text;
//!
//! let chunks = build_chunks_from_text("Q3 Report.pdf", "one two three", 220, 40).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_id, "q3-report-pdf-chunk-1");
//! assert_eq!(chunks[0].source_name, "Q3 Report.pdf");
//! ```

use thiserror::Error;

use crate::models::Chunk;

/// Default window length, in words.
pub const DEFAULT_CHUNK_SIZE: usize = 220;
/// Default number of words shared by consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 40;

/// Invalid chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Split `text` into overlapping word windows.
///
/// Returns an empty vector when `text` has no words.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<String>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    if chunk_overlap >= chunk_size {
        return Err(ChunkError::OverlapTooLarge {
            size: chunk_size,
            overlap: chunk_overlap,
        });
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();

    for start in (0..words.len()).step_by(step) {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
    }

    Ok(chunks)
}

/// Chunk `text` and wrap each window in a [`Chunk`] labelled with
/// `source_name`.
pub fn build_chunks_from_text(
    source_name: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, ChunkError> {
    let source_slug = slugify(source_name);

    Ok(chunk_text(text, chunk_size, chunk_overlap)?
        .into_iter()
        .enumerate()
        .map(|(i, window)| {
            Chunk::new(
                format!("{}-chunk-{}", source_slug, i + 1),
                source_name,
                window,
            )
        })
        .collect())
}

/// Lowercase `value` and collapse every run of non-alphanumeric ASCII into
/// a single `-`. Falls back to `"document"` when nothing is left.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "document".to_string()
    } else {
        slug
    }
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
