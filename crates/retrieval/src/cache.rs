//! Corpus fingerprinting and snapshot restore/persist.

use crate::corpus::CorpusFile;
use crate::snapshot::{self, Snapshot};
use lexrag_core::{AppResult, RetrievalConfig};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Digest over the document set: any added, removed, or modified file under
/// the corpus root changes the fingerprint and invalidates the snapshot.
///
/// Input order does not matter; triples are folded in sorted source order.
pub fn compute_fingerprint(files: &[CorpusFile]) -> String {
    let mut sorted: Vec<&CorpusFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.source.cmp(&b.source));

    let mut hasher = Sha256::new();
    for file in sorted {
        hasher.update(file.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(file.content_hash.as_bytes());
        hasher.update([0u8]);
        hasher.update(file.modified_ms.to_le_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Owns the snapshot location and the match-or-rebuild decision.
pub struct CacheManager {
    snapshot_path: PathBuf,
}

impl CacheManager {
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self { snapshot_path }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Restore the snapshot if it matches the current corpus and retrieval
    /// parameters.
    ///
    /// Missing, stale, and damaged snapshots all yield `None`; damage is
    /// logged and then repaired by the rebuild that follows, never
    /// propagated. A snapshot built with different chunking or embedding
    /// parameters is treated as stale.
    pub fn try_restore(&self, fingerprint: &str, params: &RetrievalConfig) -> Option<Snapshot> {
        if !self.snapshot_path.exists() {
            tracing::debug!("No snapshot at {:?}", self.snapshot_path);
            return None;
        }

        match snapshot::read_snapshot(&self.snapshot_path) {
            Ok(snap) if snap.fingerprint != fingerprint => {
                tracing::debug!("Snapshot fingerprint is stale, rebuilding");
                None
            }
            Ok(snap)
                if snap.embedding_dim != params.embedding_dim
                    || snap.chunk_size != params.chunk_size
                    || snap.chunk_overlap != params.chunk_overlap =>
            {
                tracing::debug!("Snapshot was built with different parameters, rebuilding");
                None
            }
            Ok(snap) => {
                tracing::debug!("Restored snapshot with {} chunks", snap.entries.len());
                Some(snap)
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot, rebuilding: {}", e);
                None
            }
        }
    }

    pub fn persist(&self, snapshot: &Snapshot) -> AppResult<()> {
        snapshot::write_snapshot(&self.snapshot_path, snapshot)
    }

    /// Remove the persisted snapshot and any leftover staging file.
    pub fn clear(&self) -> AppResult<()> {
        let tmp = snapshot::temp_path(&self.snapshot_path);
        for path in [&self.snapshot_path, &tmp] {
            if path.exists() {
                std::fs::remove_file(path)?;
                tracing::debug!("Removed {:?}", path);
            }
        }
        Ok(())
    }
}
