//! Context-window assembly for prompting a language model.
//!
//! Each result becomes a block:
//!
//! ```text
//! [<chunk_id> | <source_name> | score=<score:.3>]
//! <chunk text>
//! ```
//!
//! Blocks are joined with a blank line, in the given order. The budget is
//! greedy: every block costs its length plus 2 for the separator, the first
//! block is always kept, and assembly stops at the first block that would
//! overflow `max_chars`. Lengths are counted in characters.

use crate::models::SearchResult;

/// Default character budget for [`build_context`].
pub const DEFAULT_MAX_CHARS: usize = 8000;

const SEPARATOR: &str = "\n\n";

/// Format ranked results into a single context string bounded by
/// `max_chars`. Returns an empty string for no results.
pub fn build_context(results: &[SearchResult], max_chars: usize) -> String {
    let mut sections: Vec<String> = Vec::new();
    let mut total_chars = 0usize;

    for result in results {
        let block = format_block(result);
        let estimated_length = block.chars().count() + SEPARATOR.len();

        if !sections.is_empty() && total_chars + estimated_length > max_chars {
            break;
        }

        sections.push(block);
        total_chars += estimated_length;
    }

    sections.join(SEPARATOR)
}

fn format_block(result: &SearchResult) -> String {
    let header = format!(
        "[{} | {} | score={:.3}]",
        result.chunk.chunk_id, result.chunk.source_name, result.score
    );
    format!("{}\n{}", header, result.chunk.text)
        .trim()
        .to_string()
}
