//! # docchat Core
//!
//! Shared, I/O-free logic for docchat: the chunk model, word-window
//! chunking, the tokenizer, the in-memory TF-IDF index, and the context
//! assembler that feeds a language model.
//!
//! This crate contains no tokio, filesystem, or network dependencies.
//! Index construction and search are pure, synchronous computations over
//! data already in memory.
//!
//! ```rust
//! use docchat_core::{build_context, Chunk, TfidfIndex};
//!
//! let index = TfidfIndex::new(vec![
//!     Chunk::new("c1", "notes.pdf", "apple banana fruit"),
//!     Chunk::new("c2", "notes.pdf", "car engine vehicle"),
//! ]);
//! let results = index.search("apple", 5, 0.05);
//! assert_eq!(results[0].chunk.chunk_id, "c1");
//! assert!(build_context(&results, 8000).starts_with("[c1 | notes.pdf | score="));
//! ```

pub mod chunk;
pub mod context;
pub mod handle;
pub mod index;
pub mod models;
pub mod tokenize;

pub use chunk::{build_chunks_from_text, chunk_text, ChunkError};
pub use context::{build_context, DEFAULT_MAX_CHARS};
pub use handle::IndexHandle;
pub use index::{dot, TfidfIndex, DEFAULT_MIN_SCORE, DEFAULT_TOP_K};
pub use models::{Chunk, SearchResult};
pub use tokenize::tokenize;
