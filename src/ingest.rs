//! Document ingestion
//!
//! Splits plain-text files into overlapping chunks and inserts them into
//! the vector index. A plain I/O wrapper with no decision logic: the
//! splitter prefers paragraph, newline, then space boundaries within the
//! chunk window and falls back to a hard cut.
//!
//! Only `.txt` and `.md` files are supported; directories are walked
//! recursively. Web ingestion is intentionally disabled at the HTTP layer,
//! so this module is reached through the CLI.

use crate::error::{LorebookError, Result};
use crate::index::LocalVectorStore;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported file extensions (lowercase, without dot)
const SUPPORTED_EXTS: [&str; 2] = ["txt", "md"];

/// Outcome of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Files read
    pub files: usize,
    /// Chunks inserted into the index
    pub chunks: usize,
}

/// Split text into overlapping chunks
///
/// Chunks are at most `chunk_size` characters. When a chunk does not end
/// the text, the cut prefers the last paragraph break in the window, then
/// the last newline, then the last space; the search never backtracks
/// past half the window, so degenerate input still makes progress. The
/// next chunk starts `overlap` characters before the cut.
///
/// # Examples
///
/// ```
/// use lorebook::ingest::chunk_text;
///
/// let chunks = chunk_text("short text", 800, 120);
/// assert_eq!(chunks, vec!["short text".to_string()]);
/// assert!(chunk_text("", 800, 120).is_empty());
/// ```
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if chars.len() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let cut = if end < chars.len() {
            boundary_cut(&chars, start, end)
        } else {
            end
        };

        let chunk: String = chars[start..cut].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if cut >= chars.len() {
            break;
        }
        start = std::cmp::max(cut.saturating_sub(overlap), start + 1);
    }
    chunks
}

/// Best cut position within `(start, end]`, preferring natural boundaries
fn boundary_cut(chars: &[char], start: usize, end: usize) -> usize {
    let floor = start + (end - start) / 2;

    // Paragraph break
    for i in (floor.max(start + 2)..end).rev() {
        if chars[i - 1] == '\n' && chars[i - 2] == '\n' {
            return i;
        }
    }
    // Newline
    for i in (floor.max(start + 1)..end).rev() {
        if chars[i - 1] == '\n' {
            return i;
        }
    }
    // Space
    for i in (floor.max(start + 1)..end).rev() {
        if chars[i - 1] == ' ' {
            return i;
        }
    }
    end
}

/// Whether a path has a supported extension
fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand the given paths into a sorted list of ingestible files
///
/// Files must exist and carry a supported extension; directories are
/// walked recursively and unsupported entries inside them are skipped.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(
                LorebookError::Validation(format!("File not found: {}", path.display())).into(),
            );
        }
        if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() && is_supported(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if is_supported(path) {
            files.push(path.clone());
        } else {
            return Err(LorebookError::Validation(format!(
                "Unsupported file type: {}",
                path.display()
            ))
            .into());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Ingest files into the vector index
///
/// # Arguments
///
/// * `store` - Target vector store
/// * `paths` - Files or directories to ingest
/// * `chunk_size` - Chunk size in characters
/// * `overlap` - Chunk overlap in characters
///
/// # Errors
///
/// Fails on missing files, explicitly named unsupported files, unreadable
/// content, or embedding/index errors.
pub async fn ingest_paths(
    store: &LocalVectorStore,
    paths: &[PathBuf],
    chunk_size: usize,
    overlap: usize,
) -> Result<IngestReport> {
    let files = collect_files(paths)?;

    let mut documents = Vec::new();
    for file in &files {
        let text = std::fs::read_to_string(file).map_err(LorebookError::Io)?;
        let source = file.display().to_string();
        for chunk in chunk_text(&text, chunk_size, overlap) {
            documents.push((chunk, Some(source.clone())));
        }
        tracing::debug!("Chunked {}", source);
    }

    let chunks = store.add_documents(&documents).await?;
    tracing::info!("Ingested {} files into {} chunks", files.len(), chunks);

    Ok(IngestReport {
        files: files.len(),
        chunks,
    })
}
