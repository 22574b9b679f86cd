//! Chat session state: the current index, the conversation, and the
//! answer generator.
//!
//! Loading new documents rebuilds the index wholesale through an
//! [`IndexHandle`] and starts a fresh conversation.

use serde::Serialize;

use docchat_core::{Chunk, IndexHandle, SearchResult};

use crate::config::Config;
use crate::llm::{one_line, truncate_chars, AnswerGenerator, ChatMessage, Role};

const PREVIEW_CHARS: usize = 180;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no documents loaded; upload and process at least one .docx or .pdf file first")]
    NoIndex,
}

/// A retrieved chunk shown alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub chunk_id: String,
    pub document: String,
    pub score: f64,
    pub preview: String,
}

impl From<&SearchResult> for SourceRef {
    fn from(result: &SearchResult) -> Self {
        Self {
            chunk_id: result.chunk.chunk_id.clone(),
            document: result.chunk.source_name.clone(),
            score: result.score,
            preview: truncate_chars(&one_line(&result.chunk.text), PREVIEW_CHARS),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

pub struct ChatSession {
    config: Config,
    index: IndexHandle,
    messages: Vec<ChatMessage>,
    generator: AnswerGenerator,
}

impl ChatSession {
    pub fn new(config: Config, generator: AnswerGenerator) -> Self {
        Self {
            config,
            index: IndexHandle::new(),
            messages: Vec::new(),
            generator,
        }
    }

    /// Replace the indexed documents and start a new conversation.
    /// Returns the number of indexed chunks. Loading nothing unloads the
    /// current documents.
    pub fn load(&mut self, chunks: Vec<Chunk>) -> usize {
        self.messages.clear();
        if chunks.is_empty() {
            self.index.clear();
            tracing::info!("index cleared");
            return 0;
        }

        let index = self.index.replace(chunks);
        tracing::info!(chunks = index.len(), vocabulary = index.vocabulary_size(), "index rebuilt");
        index.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_loaded()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    /// Retrieve with the configured `top_k` and `min_score`.
    pub fn retrieve(&self, question: &str) -> Vec<SearchResult> {
        let retrieval = &self.config.retrieval;
        self.index.search(question, retrieval.top_k, retrieval.min_score)
    }

    /// Answer `question` and record the exchange in the history.
    pub async fn ask(&mut self, question: &str) -> Result<Answer, SessionError> {
        if !self.index.is_loaded() {
            return Err(SessionError::NoIndex);
        }

        let results = self.retrieve(question);
        let text = self.generator.answer(question, &results, &self.messages).await;

        self.messages.push(ChatMessage::new(Role::User, question));
        self.messages.push(ChatMessage::new(Role::Assistant, text.clone()));

        Ok(Answer {
            text,
            sources: results.iter().map(SourceRef::from).collect(),
        })
    }
}
