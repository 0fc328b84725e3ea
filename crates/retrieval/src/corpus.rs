//! Corpus directory scanning and content hashing.

use lexrag_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file discovered under the corpus root.
///
/// Raw bytes are held in memory (the corpus is assumed to fit); the content
/// hash and modification marker feed the cache fingerprint.
#[derive(Debug, Clone)]
pub struct CorpusFile {
    /// Stable document identifier: path relative to the corpus root
    pub source: String,

    /// Absolute path on disk
    pub path: PathBuf,

    /// Raw file content
    pub data: Vec<u8>,

    /// SHA-256 of the raw content, hex-encoded
    pub content_hash: String,

    /// Modification time in milliseconds since the epoch (0 if unavailable)
    pub modified_ms: i64,
}

/// Scan the corpus directory recursively.
///
/// Hidden files and directories are skipped. Results are sorted by source
/// identifier so every downstream step (fingerprinting, vocabulary index
/// assignment, insertion order) sees the same document order on every run.
///
/// A file that cannot be read is skipped with a warning instead of failing
/// the scan; it stays out of the fingerprint, so restoring read access
/// changes the fingerprint and the file rejoins the corpus on the next
/// rebuild.
pub fn scan_corpus(root: &Path) -> AppResult<(Vec<CorpusFile>, Vec<String>)> {
    if !root.is_dir() {
        return Err(AppError::Validation(format!(
            "Corpus directory does not exist: {:?}",
            root
        )));
    }

    let mut files = Vec::new();
    let mut warnings = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let source = relative_source(root, path);
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                let message = format!("Skipped {}: {}", source, e);
                tracing::warn!("{}", message);
                warnings.push(message);
                continue;
            }
        };

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let content_hash = format!("{:x}", hasher.finalize());

        let modified_ms = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        files.push(CorpusFile {
            source,
            path: path.to_path_buf(),
            data,
            content_hash,
            modified_ms,
        });
    }

    files.sort_by(|a, b| a.source.cmp(&b.source));

    tracing::debug!("Scanned {} corpus files under {:?}", files.len(), root);
    Ok((files, warnings))
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn relative_source(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
