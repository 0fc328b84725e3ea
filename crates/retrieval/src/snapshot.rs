//! SQLite snapshot persistence for a built index.

use crate::index::IndexEntry;
use crate::types::Chunk;
use chrono::{DateTime, Utc};
use lexrag_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// Bumped whenever the on-disk layout changes; readers reject anything else
/// and the cache layer rebuilds from the corpus.
const SCHEMA_VERSION: i64 = 1;

/// Everything needed to reconstruct a built index without re-reading the
/// corpus.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
    /// Parameters the index was built with; a restore under different
    /// parameters must rebuild instead
    pub embedding_dim: u32,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub chunk_count: u32,
    /// `(term, vocabulary index, document frequency)` rows
    pub term_rows: Vec<(String, u32, u32)>,
    pub entries: Vec<IndexEntry>,
}

/// Staging path used while a snapshot is being written.
pub fn temp_path(path: &Path) -> std::path::PathBuf {
    path.with_extension("sqlite.tmp")
}

/// Write a snapshot, publishing atomically.
///
/// The database is assembled at a sibling `.tmp` path and renamed over the
/// destination only once fully written, so a crash mid-write never leaves a
/// half-built snapshot where the next run would find it.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Serialization(format!("Failed to create snapshot directory: {}", e))
        })?;
    }

    let tmp_path = temp_path(path);
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path).map_err(|e| {
            AppError::Serialization(format!("Failed to remove stale snapshot temp: {}", e))
        })?;
    }

    let mut conn = Connection::open(&tmp_path)
        .map_err(|e| AppError::Serialization(format!("Failed to open snapshot temp: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE terms (
            term TEXT PRIMARY KEY,
            term_index INTEGER NOT NULL,
            df INTEGER NOT NULL
        );

        CREATE TABLE chunks (
            id INTEGER PRIMARY KEY,
            source TEXT NOT NULL,
            seq INTEGER NOT NULL,
            start_word INTEGER NOT NULL,
            end_word INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );
        "#,
    )
    .map_err(|e| AppError::Serialization(format!("Failed to create snapshot tables: {}", e)))?;

    let tx = conn
        .transaction()
        .map_err(|e| AppError::Serialization(format!("Failed to begin snapshot write: {}", e)))?;

    {
        let mut meta = tx
            .prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")
            .map_err(|e| AppError::Serialization(format!("Failed to prepare meta insert: {}", e)))?;
        let rows = [
            ("schema_version", SCHEMA_VERSION.to_string()),
            ("fingerprint", snapshot.fingerprint.clone()),
            ("built_at", snapshot.built_at.to_rfc3339()),
            ("embedding_dim", snapshot.embedding_dim.to_string()),
            ("chunk_size", snapshot.chunk_size.to_string()),
            ("chunk_overlap", snapshot.chunk_overlap.to_string()),
            ("chunk_count", snapshot.chunk_count.to_string()),
        ];
        for (key, value) in rows {
            meta.execute(params![key, value]).map_err(|e| {
                AppError::Serialization(format!("Failed to write snapshot meta: {}", e))
            })?;
        }

        let mut term = tx
            .prepare("INSERT INTO terms (term, term_index, df) VALUES (?1, ?2, ?3)")
            .map_err(|e| AppError::Serialization(format!("Failed to prepare term insert: {}", e)))?;
        for (text, index, df) in &snapshot.term_rows {
            term.execute(params![text, *index as i64, *df as i64])
                .map_err(|e| {
                    AppError::Serialization(format!("Failed to write snapshot term: {}", e))
                })?;
        }

        let mut chunk = tx
            .prepare(
                "INSERT INTO chunks (source, seq, start_word, end_word, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|e| {
                AppError::Serialization(format!("Failed to prepare chunk insert: {}", e))
            })?;
        for entry in &snapshot.entries {
            chunk
                .execute(params![
                    entry.chunk.source,
                    entry.chunk.seq as i64,
                    entry.chunk.start_word as i64,
                    entry.chunk.end_word as i64,
                    entry.chunk.text,
                    embedding_to_bytes(&entry.embedding),
                ])
                .map_err(|e| {
                    AppError::Serialization(format!("Failed to write snapshot chunk: {}", e))
                })?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Serialization(format!("Failed to commit snapshot: {}", e)))?;
    drop(conn);

    std::fs::rename(&tmp_path, path)
        .map_err(|e| AppError::Serialization(format!("Failed to publish snapshot: {}", e)))?;

    tracing::debug!(
        "Wrote snapshot: {} chunks, {} terms at {:?}",
        snapshot.entries.len(),
        snapshot.term_rows.len(),
        path
    );
    Ok(())
}

/// Read a snapshot back; any structural problem maps to `CacheCorruption`
/// so callers can fall back to a rebuild.
pub fn read_snapshot(path: &Path) -> AppResult<Snapshot> {
    let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| AppError::CacheCorruption(format!("Failed to open snapshot: {}", e)))?;

    let version: i64 = meta_value(&conn, "schema_version")?
        .parse()
        .map_err(|_| AppError::CacheCorruption("Non-numeric schema version".to_string()))?;
    if version != SCHEMA_VERSION {
        return Err(AppError::CacheCorruption(format!(
            "Snapshot schema version {} does not match {}",
            version, SCHEMA_VERSION
        )));
    }

    let fingerprint = meta_value(&conn, "fingerprint")?;
    let built_at = DateTime::parse_from_rfc3339(&meta_value(&conn, "built_at")?)
        .map_err(|_| AppError::CacheCorruption("Invalid snapshot timestamp".to_string()))?
        .with_timezone(&Utc);
    let embedding_dim = numeric_meta(&conn, "embedding_dim")?;
    let chunk_size = numeric_meta(&conn, "chunk_size")?;
    let chunk_overlap = numeric_meta(&conn, "chunk_overlap")?;
    let chunk_count = numeric_meta(&conn, "chunk_count")?;

    let mut stmt = conn
        .prepare("SELECT term, term_index, df FROM terms ORDER BY term_index")
        .map_err(|e| AppError::CacheCorruption(format!("Failed to read snapshot terms: {}", e)))?;
    let term_rows: Vec<(String, u32, u32)> = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)? as u32,
                row.get::<_, i64>(2)? as u32,
            ))
        })
        .map_err(|e| AppError::CacheCorruption(format!("Failed to read snapshot terms: {}", e)))?
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::CacheCorruption(format!("Damaged snapshot term row: {}", e)))?;

    let mut stmt = conn
        .prepare(
            "SELECT source, seq, start_word, end_word, text, embedding
             FROM chunks ORDER BY id",
        )
        .map_err(|e| AppError::CacheCorruption(format!("Failed to read snapshot chunks: {}", e)))?;
    let raw_entries: Vec<(Chunk, Vec<u8>)> = stmt
        .query_map([], |row| {
            let chunk = Chunk {
                source: row.get(0)?,
                seq: row.get::<_, i64>(1)? as u32,
                start_word: row.get::<_, i64>(2)? as usize,
                end_word: row.get::<_, i64>(3)? as usize,
                text: row.get(4)?,
            };
            Ok((chunk, row.get::<_, Vec<u8>>(5)?))
        })
        .map_err(|e| AppError::CacheCorruption(format!("Failed to read snapshot chunks: {}", e)))?
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::CacheCorruption(format!("Damaged snapshot chunk row: {}", e)))?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (chunk, bytes) in raw_entries {
        let embedding = bytes_to_embedding(&bytes)?;
        if embedding.len() != embedding_dim as usize {
            return Err(AppError::CacheCorruption(format!(
                "Embedding length {} does not match dimension {}",
                embedding.len(),
                embedding_dim
            )));
        }
        entries.push(IndexEntry { chunk, embedding });
    }

    Ok(Snapshot {
        fingerprint,
        built_at,
        embedding_dim,
        chunk_size,
        chunk_overlap,
        chunk_count,
        term_rows,
        entries,
    })
}

fn meta_value(conn: &Connection, key: &str) -> AppResult<String> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .map_err(|e| AppError::CacheCorruption(format!("Missing snapshot meta '{}': {}", key, e)))
}

fn numeric_meta(conn: &Connection, key: &str) -> AppResult<u32> {
    meta_value(conn, key)?.parse().map_err(|_| {
        AppError::CacheCorruption(format!("Non-numeric snapshot meta '{}'", key))
    })
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::CacheCorruption(
            "Invalid embedding byte length".to_string(),
        ));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        embedding.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(embedding)
}
