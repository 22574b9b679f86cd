//! `docchat ask` and `docchat chat`: grounded question answering over a set
//! of documents loaded for the lifetime of the command.
//!
//! The interactive loop reads one question per line from stdin. Two
//! commands are recognized:
//!
//! | Input    | Effect                           |
//! |----------|----------------------------------|
//! | `/clear` | forget the conversation so far   |
//! | `/quit`  | exit (so does end of input)      |

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::ingest::load_documents;
use crate::llm::AnswerGenerator;
use crate::session::{Answer, ChatSession};

/// Build a session over `files`, ready to answer questions.
pub fn open_session(config: &Config, files: &[PathBuf]) -> Result<ChatSession> {
    let generator =
        AnswerGenerator::new(&config.llm)?.with_context_budget(config.retrieval.max_context_chars);
    if generator.has_model() {
        eprintln!("Answering with {}.", generator.model());
    } else {
        eprintln!(
            "note: {} is not set; answers list the closest excerpts only",
            config.llm.api_key_env
        );
    }

    let report = load_documents(config, files)?;
    let processed = report.processed_files;
    let mut session = ChatSession::new(config.clone(), generator);
    let chunks = session.load(report.chunks);
    eprintln!("Indexed {} chunk(s) from {} file(s).", chunks, processed);

    Ok(session)
}

pub async fn run_ask(config: &Config, files: &[PathBuf], question: &str, json: bool) -> Result<()> {
    let mut session = open_session(config, files)?;
    let answer = session.ask(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", format_answer(&answer));
    }
    Ok(())
}

pub async fn run_chat(config: &Config, files: &[PathBuf]) -> Result<()> {
    let mut session = open_session(config, files)?;
    println!("Ask a question about your documents. /clear resets the conversation, /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_history();
                println!("Conversation cleared.");
            }
            question => {
                let answer = session.ask(question).await?;
                println!("{}", format_answer(&answer));
            }
        }
    }

    Ok(())
}

/// Answer text followed by the retrieved sources.
pub fn format_answer(answer: &Answer) -> String {
    let mut out = format!("{}\n", answer.text);
    if answer.sources.is_empty() {
        return out;
    }

    out.push_str("\nSources:\n");
    for source in &answer.sources {
        out.push_str(&format!(
            "  - {} ({}, score={:.3}): {}\n",
            source.document, source.chunk_id, source.score, source.preview
        ));
    }
    out
}
