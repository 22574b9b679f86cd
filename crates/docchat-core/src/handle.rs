//! Swappable reference to the most recently built index.
//!
//! Rebuilding never mutates an index in use: a new [`TfidfIndex`] is built
//! outside the lock and swapped in under a short write lock. Searches that
//! already cloned the previous `Arc` finish against the old index.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::index::TfidfIndex;
use crate::models::{Chunk, SearchResult};

/// Single owner of "the current index", shared across threads.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<TfidfIndex>>>,
}

impl IndexHandle {
    /// A handle with no index built yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new index from `chunks` and make it current.
    pub fn replace<I>(&self, chunks: I) -> Arc<TfidfIndex>
    where
        I: IntoIterator<Item = Chunk>,
    {
        let index = Arc::new(TfidfIndex::new(chunks));
        *self.write() = Some(Arc::clone(&index));
        index
    }

    /// The current index, if one has been built.
    pub fn current(&self) -> Option<Arc<TfidfIndex>> {
        self.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    /// Drop the current index.
    pub fn clear(&self) {
        *self.write() = None;
    }

    /// Search the current index; no index means no results.
    pub fn search(&self, query: &str, top_k: usize, min_score: f64) -> Vec<SearchResult> {
        match self.current() {
            Some(index) => index.search(query, top_k, min_score),
            None => Vec::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<TfidfIndex>>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<TfidfIndex>>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }
}
