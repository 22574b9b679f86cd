//! `docchat search` and `docchat context`: one-shot retrieval over a set of
//! documents, printed for humans or as JSON.

use anyhow::Result;
use std::path::PathBuf;

use docchat_core::{build_context, SearchResult, TfidfIndex};

use crate::config::Config;
use crate::ingest::load_documents;
use crate::llm::{one_line, truncate_chars};

const EXCERPT_CHARS: usize = 200;

/// Retrieval parameters for a single query, resolved against the config.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub top_k: usize,
    pub min_score: f64,
}

impl SearchOptions {
    pub fn resolve(config: &Config, top_k: Option<usize>, min_score: Option<f64>) -> Self {
        Self {
            top_k: top_k.unwrap_or(config.retrieval.top_k),
            min_score: min_score.unwrap_or(config.retrieval.min_score),
        }
    }
}

/// Ingest `files`, index them and return the ranked results for `query`.
pub fn retrieve(
    config: &Config,
    files: &[PathBuf],
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchResult>> {
    let report = load_documents(config, files)?;
    let index = TfidfIndex::new(report.chunks);
    Ok(index.search(query, options.top_k, options.min_score))
}

pub fn run_search(
    config: &Config,
    files: &[PathBuf],
    query: &str,
    options: SearchOptions,
    json: bool,
) -> Result<()> {
    let results = retrieve(config, files, query, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", format_results(&results));
    }
    Ok(())
}

pub fn run_context(
    config: &Config,
    files: &[PathBuf],
    query: &str,
    options: SearchOptions,
    max_chars: Option<usize>,
) -> Result<()> {
    let results = retrieve(config, files, query, options)?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let max_chars = max_chars.unwrap_or(config.retrieval.max_context_chars);
    println!("{}", build_context(&results, max_chars));
    Ok(())
}

/// Numbered, human-readable rendering of `results`.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{:.3}] {} / {}\n",
            i + 1,
            result.score,
            result.chunk.source_name,
            result.chunk.chunk_id
        ));
        out.push_str(&format!(
            "    excerpt: \"{}\"\n\n",
            truncate_chars(&one_line(&result.chunk.text), EXCERPT_CHARS)
        ));
    }
    out
}
