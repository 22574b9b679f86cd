//! # docchat CLI
//!
//! The `docchat` binary indexes PDF and Word documents in memory and answers
//! questions about them.
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat index <paths>` | Ingest documents and print an index summary |
//! | `docchat chunks <file>` | Print the chunks produced for one document |
//! | `docchat search "<query>" -f <paths>` | Ranked chunks for a query |
//! | `docchat context "<query>" -f <paths>` | The context block a model would receive |
//! | `docchat ask "<question>" -f <paths>` | One grounded answer |
//! | `docchat chat -f <paths>` | Interactive question answering |
//!
//! `OPENAI_API_KEY` enables model answers; without it `ask` and `chat`
//! list the closest excerpts instead.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docchat::search::SearchOptions;
use docchat::{chat, config, ingest, search};

/// docchat: question answering over your own PDF and Word documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Question answering over your own PDF and Word documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents and print a summary of the index.
    ///
    /// Directories are searched recursively for `.pdf` and `.docx` files.
    Index {
        /// Files or directories to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the chunks produced for a single document.
    Chunks {
        /// A `.pdf` or `.docx` file.
        file: PathBuf,
    },

    /// Rank document chunks against a query.
    Search {
        /// The search query string.
        query: String,

        /// Files or directories to search.
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum cosine score (defaults to `retrieval.min_score`).
        #[arg(long)]
        min_score: Option<f64>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the context block assembled for a query.
    Context {
        query: String,

        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        min_score: Option<f64>,

        /// Character budget (defaults to `retrieval.max_context_chars`).
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Answer one question.
    Ask {
        question: String,

        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Print the answer and its sources as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive chat over the documents.
    Chat {
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Index { paths } => {
            ingest::run_index(&cfg, &paths)?;
        }
        Commands::Chunks { file } => {
            ingest::run_chunks(&cfg, &file)?;
        }
        Commands::Search {
            query,
            files,
            top_k,
            min_score,
            json,
        } => {
            let options = SearchOptions::resolve(&cfg, top_k, min_score);
            search::run_search(&cfg, &files, &query, options, json)?;
        }
        Commands::Context {
            query,
            files,
            top_k,
            min_score,
            max_chars,
        } => {
            let options = SearchOptions::resolve(&cfg, top_k, min_score);
            search::run_context(&cfg, &files, &query, options, max_chars)?;
        }
        Commands::Ask {
            question,
            files,
            json,
        } => {
            chat::run_ask(&cfg, &files, &question, json).await?;
        }
        Commands::Chat { files } => {
            chat::run_chat(&cfg, &files).await?;
        }
    }

    Ok(())
}
