//! Ingestion pipeline: files → extracted text → chunks.
//!
//! A batch never aborts on a bad file. Files that cannot be read, parsed,
//! or that yield no text are reported in [`IngestReport::failed_files`] and
//! the rest of the batch continues. The caller decides whether the batch
//! produced enough chunks to (re)build an index.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use docchat_core::{build_chunks_from_text, Chunk, TfidfIndex};

use crate::config::{ChunkingConfig, Config};
use crate::extract::{extract_text_from_file, is_supported};

/// Outcome of ingesting a batch of files.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// All chunks, in input file order.
    pub chunks: Vec<Chunk>,
    /// Number of files that produced at least one chunk.
    pub processed_files: usize,
    /// Names of files that were skipped.
    pub failed_files: Vec<String>,
}

/// Extract and chunk one document held in memory.
pub fn build_chunks_from_file(
    file_name: &str,
    bytes: &[u8],
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>> {
    let text = extract_text_from_file(file_name, bytes)?;
    let chunks = build_chunks_from_text(file_name, &text, config.chunk_size, config.chunk_overlap)?;
    Ok(chunks)
}

/// Expand `paths` into the list of documents to ingest.
///
/// Files are taken as given, whatever their extension (unsupported ones are
/// reported as failures later). Directories are walked recursively and only
/// supported documents are kept, sorted for deterministic ordering.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path) {
                let entry = entry
                    .with_context(|| format!("Failed to walk directory: {}", path.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if is_supported(&entry.file_name().to_string_lossy()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            inputs.extend(found);
        } else {
            inputs.push(path.clone());
        }
    }

    Ok(inputs)
}

/// Ingest every file in `paths`, collecting chunks and failures.
pub fn ingest_files(paths: &[PathBuf], config: &ChunkingConfig) -> IngestReport {
    let mut report = IngestReport::default();

    for path in paths {
        let file_name = display_name(path);
        match ingest_file(path, &file_name, config) {
            Ok(chunks) if !chunks.is_empty() => {
                tracing::debug!(file = %file_name, chunks = chunks.len(), "ingested file");
                report.chunks.extend(chunks);
                report.processed_files += 1;
            }
            Ok(_) => {
                tracing::warn!(file = %file_name, "no readable text found");
                report.failed_files.push(file_name);
            }
            Err(e) => {
                tracing::warn!(file = %file_name, error = %format!("{:#}", e), "could not parse file");
                report.failed_files.push(file_name);
            }
        }
    }

    tracing::info!(
        chunks = report.chunks.len(),
        processed = report.processed_files,
        failed = report.failed_files.len(),
        "ingestion finished"
    );

    report
}

/// Collect and ingest `paths`, failing only when nothing at all could be
/// indexed.
pub fn load_documents(config: &Config, paths: &[PathBuf]) -> Result<IngestReport> {
    let inputs = collect_inputs(paths)?;
    if inputs.is_empty() {
        bail!("No .docx or .pdf files given. Pass at least one document or directory.");
    }

    let report = ingest_files(&inputs, &config.chunking);
    if report.chunks.is_empty() {
        bail!(
            "No readable text found in the selected files. Could not parse: {}",
            report.failed_files.join(", ")
        );
    }
    if !report.failed_files.is_empty() {
        eprintln!("Could not parse: {}", report.failed_files.join(", "));
    }

    Ok(report)
}

/// `docchat index`: ingest documents and print a summary.
pub fn run_index(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let report = load_documents(config, paths)?;
    let index = TfidfIndex::new(report.chunks);

    println!(
        "Indexed {} chunk(s) from {} file(s).",
        index.len(),
        report.processed_files
    );
    println!("  vocabulary: {} terms", index.vocabulary_size());
    println!(
        "  chunking: {} words, {} overlap",
        config.chunking.chunk_size, config.chunking.chunk_overlap
    );
    if !report.failed_files.is_empty() {
        println!("  skipped: {}", report.failed_files.join(", "));
    }
    println!("ok");
    Ok(())
}

/// `docchat chunks`: print the chunks produced for a single document.
pub fn run_chunks(config: &Config, path: &Path) -> Result<()> {
    let file_name = display_name(path);
    let chunks = ingest_file(path, &file_name, &config.chunking)?;

    if chunks.is_empty() {
        println!("No readable text found in {}.", file_name);
        return Ok(());
    }

    for chunk in &chunks {
        println!("[{} | {}]", chunk.chunk_id, chunk.source_name);
        println!("{}", chunk.text);
        println!();
    }
    println!("{} chunk(s)", chunks.len());
    Ok(())
}

fn ingest_file(path: &Path, file_name: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    build_chunks_from_file(file_name, &bytes, config)
}

/// The label used as a chunk's `source_name`: the bare file name.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
