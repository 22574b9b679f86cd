//! In-memory TF-IDF index with cosine-similarity ranking.
//!
//! The index is built once from a fixed, ordered chunk set and is immutable
//! afterwards. Any change in the chunk set means building a new index (see
//! [`crate::handle::IndexHandle`] for swapping it in).
//!
//! # Weighting
//!
//! - `idf(t) = ln((N + 1) / (df(t) + 1)) + 1`, where `N` is the chunk count
//!   and `df(t)` the number of chunks containing `t` at least once.
//! - `tf(t, c) = count(t, c) / max_count(c)` (maximum-normalized).
//! - `w(t, c) = tf(t, c) × idf(t)`; queries are vectorized the same way, and
//!   query terms with no corpus IDF contribute nothing.
//!
//! # Search
//!
//! 1. Tokenize and vectorize the query; an empty vector or zero norm yields
//!    no results.
//! 2. Score every chunk with a non-zero norm by cosine similarity.
//! 3. Keep scores `>= min_score`.
//! 4. Stable sort by score (desc); equal scores keep chunk input order.
//! 5. Truncate to `top_k`.
//!
//! Degenerate inputs (empty index, unknown query terms, impossible
//! thresholds) return an empty vector rather than an error.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::models::{Chunk, SearchResult};
use crate::tokenize::tokenize;

/// Default number of results returned by [`TfidfIndex::search_default`].
pub const DEFAULT_TOP_K: usize = 5;
/// Default minimum cosine similarity used by [`TfidfIndex::search_default`].
pub const DEFAULT_MIN_SCORE: f64 = 0.05;

/// Sparse term → weight vector.
///
/// Ordered so that norm and dot-product summation order, and therefore
/// every score, is identical across rebuilds of the same chunk set.
pub type TermVector = BTreeMap<String, f64>;

/// TF-IDF index over an ordered chunk sequence.
///
/// `vectors` and `norms` are index-aligned with `chunks`.
#[derive(Debug, Default)]
pub struct TfidfIndex {
    chunks: Vec<Arc<Chunk>>,
    idf: HashMap<String, f64>,
    vectors: Vec<TermVector>,
    norms: Vec<f64>,
}

impl TfidfIndex {
    /// Build an index over `chunks`, preserving their order.
    ///
    /// An empty chunk sequence produces a valid index whose searches always
    /// return no results.
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Chunk>,
    {
        Self::from_shared(chunks.into_iter().map(Arc::new).collect())
    }

    /// Build an index over chunks that are already shared.
    pub fn from_shared(chunks: Vec<Arc<Chunk>>) -> Self {
        let mut index = Self {
            chunks,
            ..Self::default()
        };
        if index.chunks.is_empty() {
            return index;
        }

        let tokenized: Vec<Vec<String>> = index.chunks.iter().map(|c| tokenize(&c.text)).collect();

        let mut doc_frequencies: HashMap<&str, usize> = HashMap::new();
        for terms in &tokenized {
            let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *doc_frequencies.entry(term).or_insert(0) += 1;
            }
        }

        let num_docs = index.chunks.len() as f64;
        index.idf = doc_frequencies
            .into_iter()
            .map(|(term, df)| {
                let idf = ((num_docs + 1.0) / (df as f64 + 1.0)).ln() + 1.0;
                (term.to_string(), idf)
            })
            .collect();

        for terms in &tokenized {
            let vector = index.vectorize_terms(terms);
            index.norms.push(norm(&vector));
            index.vectors.push(vector);
        }

        tracing::debug!(
            chunks = index.chunks.len(),
            vocabulary = index.idf.len(),
            "built TF-IDF index"
        );

        index
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct terms seen across the corpus.
    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// IDF weight of `term`, or `None` if the corpus never contains it.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// Convert a token sequence into a max-normalized TF-IDF vector.
    ///
    /// Terms with no IDF entry are skipped.
    fn vectorize_terms(&self, terms: &[String]) -> TermVector {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for term in terms {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }

        let max_frequency = match counts.values().max() {
            Some(&max) => max as f64,
            None => return TermVector::new(),
        };

        counts
            .into_iter()
            .filter_map(|(term, count)| {
                let idf = self.idf.get(term)?;
                let tf = count as f64 / max_frequency;
                Some((term.to_string(), tf * idf))
            })
            .collect()
    }

    /// Return up to `top_k` chunks with cosine similarity `>= min_score`,
    /// best first.
    pub fn search(&self, query: &str, top_k: usize, min_score: f64) -> Vec<SearchResult> {
        if self.chunks.is_empty() {
            return Vec::new();
        }

        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let query_vector = self.vectorize_terms(&query_terms);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let query_norm = norm(&query_vector);
        if query_norm == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<SearchResult> = self
            .chunks
            .iter()
            .zip(self.vectors.iter().zip(&self.norms))
            .filter(|(_, (_, &chunk_norm))| chunk_norm != 0.0)
            .filter_map(|(chunk, (vector, &chunk_norm))| {
                let score = dot(&query_vector, vector) / (query_norm * chunk_norm);
                (score >= min_score).then(|| SearchResult::new(Arc::clone(chunk), score))
            })
            .collect();

        // Stable: equal scores keep their input order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        tracing::debug!(
            query_terms = query_terms.len(),
            known_terms = query_vector.len(),
            results = scored.len(),
            "TF-IDF search"
        );

        scored
    }

    /// [`search`](Self::search) with [`DEFAULT_TOP_K`] and [`DEFAULT_MIN_SCORE`].
    pub fn search_default(&self, query: &str) -> Vec<SearchResult> {
        self.search(query, DEFAULT_TOP_K, DEFAULT_MIN_SCORE)
    }
}

/// Dot product of two sparse vectors, iterating the smaller one.
pub fn dot(left: &TermVector, right: &TermVector) -> f64 {
    let (small, large) = if left.len() > right.len() {
        (right, left)
    } else {
        (left, right)
    };
    small
        .iter()
        .map(|(term, weight)| weight * large.get(term).copied().unwrap_or(0.0))
        .sum()
}

fn norm(vector: &TermVector) -> f64 {
    vector.values().map(|w| w * w).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk::new(id, "sample.docx", text)
    }

    fn vector(pairs: &[(&str, f64)]) -> TermVector {
        pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    #[test]
    fn test_dot_different_sizes() {
        let left = vector(&[("alpha", 1.0), ("beta", 2.0), ("gamma", 4.0)]);
        let right = vector(&[("beta", 3.0), ("gamma", 5.0)]);
        assert_eq!(dot(&left, &right), 2.0 * 3.0 + 4.0 * 5.0);
        assert_eq!(dot(&right, &left), 26.0);
    }

    #[test]
    fn test_dot_disjoint_and_empty() {
        let left = vector(&[("alpha", 1.0)]);
        let right = vector(&[("beta", 3.0)]);
        assert_eq!(dot(&left, &right), 0.0);
        assert_eq!(dot(&left, &TermVector::new()), 0.0);
    }

    #[test]
    fn test_idf_formula() {
        let index = TfidfIndex::new(vec![
            chunk("c1", "shared rare"),
            chunk("c2", "shared"),
            chunk("c3", "shared"),
        ]);
        // N = 3; df(shared) = 3, df(rare) = 1
        let shared = index.idf("shared").unwrap();
        let rare = index.idf("rare").unwrap();
        assert!((shared - 1.0).abs() < 1e-12);
        assert!((rare - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
        assert!(rare > shared);
        assert_eq!(index.idf("absent"), None);
        assert_eq!(index.vocabulary_size(), 2);
    }

    #[test]
    fn test_tf_is_max_normalized() {
        let index = TfidfIndex::new(vec![chunk("c1", "apple apple pie"), chunk("c2", "other")]);
        let v = &index.vectors[0];
        let idf_apple = index.idf("apple").unwrap();
        let idf_pie = index.idf("pie").unwrap();
        assert!((v["apple"] - idf_apple).abs() < 1e-12);
        assert!((v["pie"] - 0.5 * idf_pie).abs() < 1e-12);
    }

    #[test]
    fn test_vectors_and_norms_aligned() {
        let index = TfidfIndex::new(vec![
            chunk("c1", "alpha beta"),
            chunk("c2", "!!! ???"),
            chunk("c3", "gamma"),
        ]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.vectors.len(), 3);
        assert_eq!(index.norms.len(), 3);
        assert_eq!(index.norms[1], 0.0);
        assert!(index.vectors[1].is_empty());
        for (v, n) in index.vectors.iter().zip(&index.norms) {
            assert!((norm(v) - n).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_index() {
        let index = TfidfIndex::new(Vec::new());
        assert!(index.is_empty());
        assert!(index.search("anything", 5, 0.0).is_empty());
        assert!(index.search_default("anything").is_empty());
    }

    #[test]
    fn test_unknown_query_terms() {
        let index = TfidfIndex::new(vec![chunk("c1", "apple banana")]);
        assert!(index.search("kiwi mango", 5, 0.0).is_empty());
    }

    #[test]
    fn test_query_without_terms() {
        let index = TfidfIndex::new(vec![chunk("c1", "apple banana")]);
        assert!(index.search("?!", 5, 0.0).is_empty());
        assert!(index.search("", 5, 0.0).is_empty());
    }

    #[test]
    fn test_ranks_most_relevant_first() {
        let index = TfidfIndex::new(vec![
            chunk("c1", "apple banana fruit"),
            chunk("c2", "car engine vehicle"),
            chunk("c3", "apple pie apple dessert"),
        ]);
        let results = index.search("apple pie", 3, 0.0);
        assert_eq!(results[0].chunk.chunk_id, "c3");
        assert!(results[0].score >= results[1].score);
        // c2 shares no terms: score 0.0 still passes min_score 0.0
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].chunk.chunk_id, "c2");
        assert_eq!(results[2].score, 0.0);
    }

    #[test]
    fn test_identical_text_scores_one() {
        let index = TfidfIndex::new(vec![chunk("c1", "alpha beta gamma"), chunk("c2", "delta")]);
        let results = index.search("gamma beta alpha", 1, 0.0);
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_respects_top_k() {
        let chunks: Vec<Chunk> = (0..6)
            .map(|i| chunk(&format!("c{}", i), &format!("topic {} shared term", i)))
            .collect();
        let index = TfidfIndex::new(chunks);
        assert_eq!(index.search("shared term", 2, 0.0).len(), 2);
        assert!(index.search("shared term", 0, 0.0).is_empty());
    }

    #[test]
    fn test_respects_min_score() {
        let index = TfidfIndex::new(vec![chunk("c1", "alpha beta gamma")]);
        assert!(index.search("alpha", 5, 1.1).is_empty());
        assert!(index.search_default("alpha").len() == 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let index = TfidfIndex::new(vec![
            chunk("first", "common word"),
            chunk("second", "common word"),
            chunk("third", "common word"),
        ]);
        let results = index.search("common", 3, 0.0);
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
        assert_eq!(results[0].score, results[2].score);
    }

    #[test]
    fn test_zero_norm_chunks_excluded() {
        let index = TfidfIndex::new(vec![chunk("c1", "..."), chunk("c2", "alpha")]);
        let results = index.search("alpha", 5, 0.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "c2");
    }
}
