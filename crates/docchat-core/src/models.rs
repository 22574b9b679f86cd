//! Core data models shared by the index, the context assembler, and the
//! application layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A bounded span of a source document's text; the unit indexed and
/// retrieved.
///
/// Chunks are produced by the chunker ([`crate::chunk`]) and never mutated
/// afterwards. An index shares them with its results through [`Arc`], so a
/// result stays valid after the index that produced it has been replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier, unique within one index build (e.g. `report-pdf-chunk-3`).
    pub chunk_id: String,
    /// Label of the originating document, usually its file name.
    pub source_name: String,
    /// The chunk text.
    pub text: String,
}

impl Chunk {
    pub fn new(
        chunk_id: impl Into<String>,
        source_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            source_name: source_name.into(),
            text: text.into(),
        }
    }
}

/// A single retrieval hit: the matched chunk and its cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: Arc<Chunk>,
    /// Cosine similarity; in `[0, 1]` since TF-IDF weights are non-negative.
    pub score: f64,
}

impl SearchResult {
    pub fn new(chunk: impl Into<Arc<Chunk>>, score: f64) -> Self {
        Self {
            chunk: chunk.into(),
            score,
        }
    }
}
