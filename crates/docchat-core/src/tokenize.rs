//! Lexical tokenizer shared by indexing and querying.
//!
//! A term is a maximal run that starts with an ASCII letter or digit and
//! continues with letters, digits, apostrophes, or hyphens. Everything else
//! separates terms. Terms are lowercased; order and duplicates are kept.
//!
//! ```rust
//! use docchat_core::tokenize;
//!
//! assert_eq!(
//!     tokenize("Hello, world! It's high-quality text."),
//!     vec!["hello", "world", "it's", "high-quality", "text"],
//! );
//! ```

/// Split `text` into lowercase terms, in order of occurrence.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if current.is_empty() {
            if ch.is_ascii_alphanumeric() {
                current.push(ch.to_ascii_lowercase());
            }
        } else if is_continuation(ch) {
            current.push(ch.to_ascii_lowercase());
        } else {
            terms.push(std::mem::take(&mut current));
            if ch.is_ascii_alphanumeric() {
                current.push(ch.to_ascii_lowercase());
            }
        }
    }

    if !current.is_empty() {
        terms.push(current);
    }

    terms
}

fn is_continuation(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '\'' || ch == '-'
}
