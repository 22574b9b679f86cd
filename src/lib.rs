//! # docchat
//!
//! Ask questions about your own PDF and Word documents.
//!
//! Documents are extracted to plain text, split into overlapping word
//! windows, and indexed in memory with TF-IDF. Each question retrieves the
//! closest chunks and either hands them to an OpenAI-compatible chat model
//! as grounding context, or (without an API key) lists them directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────────┐
//! │ Documents  │──▶│  Extract   │──▶│ Chunk + TF-IDF │
//! │ PDF / DOCX │   │ plain text │   │  (in memory)   │
//! └────────────┘   └────────────┘   └───────┬────────┘
//!                                           │ top-k chunks
//!                                           ▼
//!                                   ┌────────────────┐
//!                                   │   LLM answer   │
//!                                   │  or excerpts   │
//!                                   └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docchat index docs/                         # show what would be indexed
//! docchat search "warranty period" -f docs/   # ranked chunks
//! docchat ask "How long is the warranty?" -f manual.pdf
//! docchat chat -f docs/                       # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`ingest`] | Files to chunks, batch reporting |
//! | [`search`] | One-shot retrieval commands |
//! | [`llm`] | Grounded answer generation |
//! | [`session`] | Chat session state |
//! | [`chat`] | Ask and interactive chat commands |
//!
//! Retrieval itself (tokenizer, chunker, TF-IDF index, context assembly)
//! lives in the `docchat-core` crate.

pub mod chat;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod search;
pub mod session;
