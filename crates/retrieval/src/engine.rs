//! Retrieval engine: state machine over scan, chunk, weight, embed, search.

use crate::cache::{self, CacheManager};
use crate::chunker::Chunker;
use crate::corpus::{self, CorpusFile};
use crate::embedder::Embedder;
use crate::index::VectorIndex;
use crate::loader;
use crate::model::WeightModel;
use crate::snapshot::Snapshot;
use crate::tokenize::tokenize;
use crate::types::{Chunk, Citation, CorpusStats, IndexReport, QueryResponse};
use chrono::{DateTime, Utc};
use lexrag_core::{AppConfig, AppError, AppResult, RetrievalConfig};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// A fully built index over one corpus state: the fitted weight model plus
/// the vector index, tagged with the fingerprint they were built from.
struct CorpusIndex {
    fingerprint: String,
    built_at: DateTime<Utc>,
    model: WeightModel,
    index: VectorIndex,
}

impl CorpusIndex {
    fn from_snapshot(snap: Snapshot) -> Self {
        let model = WeightModel::from_parts(snap.term_rows, snap.chunk_count);
        let mut index = VectorIndex::new();
        for entry in snap.entries {
            index.add(entry.chunk, entry.embedding);
        }
        Self {
            fingerprint: snap.fingerprint,
            built_at: snap.built_at,
            model,
            index,
        }
    }

    fn to_snapshot(&self, params: &RetrievalConfig) -> Snapshot {
        Snapshot {
            fingerprint: self.fingerprint.clone(),
            built_at: self.built_at,
            embedding_dim: params.embedding_dim,
            chunk_size: params.chunk_size,
            chunk_overlap: params.chunk_overlap,
            chunk_count: self.model.chunk_count(),
            term_rows: self.model.to_rows(),
            entries: self.index.entries().to_vec(),
        }
    }
}

enum EngineState {
    Uninitialized,
    Indexing,
    Ready(Arc<CorpusIndex>),
}

/// Owns the engine state and composes the pipeline into the two top-level
/// operations: indexing and querying.
///
/// Queries are served only in the `Ready` state and fail fast with
/// `NotReady` otherwise; they never block behind an in-progress rebuild. A
/// rebuild constructs the new index off to the side and swaps it in whole,
/// so queries that already hold the previous index are unaffected, and a
/// failed rebuild restores the state that preceded it unless a concurrent
/// rebuild has already installed a newer index.
pub struct RetrievalEngine {
    config: AppConfig,
    cache: CacheManager,
    chunker: Chunker,
    embedder: Embedder,
    state: RwLock<EngineState>,
}

impl RetrievalEngine {
    /// Create an engine; fails with `Validation` on bad retrieval
    /// parameters (for example overlap not smaller than the window).
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let cache = CacheManager::new(config.snapshot_path());
        let chunker = Chunker::new(
            config.retrieval.chunk_size as usize,
            config.retrieval.chunk_overlap as usize,
        );
        let embedder = Embedder::new(config.retrieval.embedding_dim as usize);

        Ok(Self {
            config,
            cache,
            chunker,
            embedder,
            state: RwLock::new(EngineState::Uninitialized),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build or refresh the index.
    ///
    /// Unless `force` is set, an index already serving the current corpus is
    /// left alone and a matching snapshot is restored instead of rebuilding.
    /// Per-document read and extraction failures become warnings in the
    /// report; a corpus yielding no chunks at all fails with `EmptyCorpus`
    /// and leaves any previous index in place.
    pub async fn index(&self, force: bool) -> AppResult<IndexReport> {
        let started = Instant::now();
        let corpus_dir = self.config.corpus_dir();
        tracing::info!("Indexing corpus at {:?}", corpus_dir);

        let (files, mut warnings) = corpus::scan_corpus(&corpus_dir)?;
        let fingerprint = cache::compute_fingerprint(&files);

        if !force {
            if let EngineState::Ready(current) = &*self.state.read().await {
                if current.fingerprint == fingerprint {
                    tracing::info!("Index is already current");
                    return Ok(IndexReport {
                        documents: current.index.distinct_sources(),
                        chunks: current.index.len(),
                        warnings,
                        duration_secs: started.elapsed().as_secs_f64(),
                        from_cache: true,
                    });
                }
            }

            if let Some(snap) = self.cache.try_restore(&fingerprint, &self.config.retrieval) {
                let corpus_index = Arc::new(CorpusIndex::from_snapshot(snap));
                let report = IndexReport {
                    documents: corpus_index.index.distinct_sources(),
                    chunks: corpus_index.index.len(),
                    warnings,
                    duration_secs: started.elapsed().as_secs_f64(),
                    from_cache: true,
                };
                *self.state.write().await = EngineState::Ready(corpus_index);
                tracing::info!("Restored index from snapshot ({} chunks)", report.chunks);
                return Ok(report);
            }
        }

        // Full rebuild. Queries fail fast with NotReady while this runs;
        // the previous index comes back if the build fails.
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, EngineState::Indexing)
        };

        match self.build_corpus_index(&files, &fingerprint) {
            Ok((corpus_index, build_warnings)) => {
                warnings.extend(build_warnings);
                let snapshot = corpus_index.to_snapshot(&self.config.retrieval);
                if let Err(e) = self.cache.persist(&snapshot) {
                    let msg = format!("Failed to persist snapshot: {}", e);
                    tracing::warn!("{}", msg);
                    warnings.push(msg);
                }

                let report = IndexReport {
                    documents: corpus_index.index.distinct_sources(),
                    chunks: corpus_index.index.len(),
                    warnings,
                    duration_secs: started.elapsed().as_secs_f64(),
                    from_cache: false,
                };
                *self.state.write().await = EngineState::Ready(Arc::new(corpus_index));
                tracing::info!(
                    "Indexed {} documents into {} chunks in {:.2}s",
                    report.documents,
                    report.chunks,
                    report.duration_secs
                );
                Ok(report)
            }
            Err(e) => {
                // Another index call may have swapped a Ready state in while
                // this build ran; only roll back if the engine is still
                // mid-index.
                let mut state = self.state.write().await;
                if matches!(&*state, EngineState::Indexing) {
                    *state = previous;
                }
                Err(e)
            }
        }
    }

    /// Run a query and return scored chunks, best first.
    ///
    /// Validation happens before the readiness check, so an empty query
    /// fails the same way whatever state the engine is in.
    pub async fn search(&self, text: &str, k: usize) -> AppResult<Vec<(Chunk, f32)>> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Query text is empty".to_string()));
        }

        let corpus_index = match &*self.state.read().await {
            EngineState::Ready(idx) => Arc::clone(idx),
            _ => {
                return Err(AppError::NotReady(
                    "No index available; run indexing first".to_string(),
                ))
            }
        };

        let tokens = tokenize(text);
        let query_vec = self.embedder.embed(&tokens, &corpus_index.model);
        let results = corpus_index.index.search(&query_vec, k);

        tracing::debug!("Query matched {} chunks (top {} requested)", results.len(), k);
        Ok(results)
    }

    /// The citation-shaped query surface: top-k per configuration, scores
    /// dropped, result order preserved.
    pub async fn query(&self, text: &str) -> AppResult<QueryResponse> {
        let results = self
            .search(text, self.config.retrieval.top_k as usize)
            .await?;

        Ok(QueryResponse {
            ranked_chunks: results
                .into_iter()
                .map(|(chunk, _)| Citation {
                    text: chunk.text,
                    source: chunk.source,
                })
                .collect(),
        })
    }

    /// Number of distinct indexed documents; 0 unless `Ready`.
    pub async fn document_count(&self) -> usize {
        match &*self.state.read().await {
            EngineState::Ready(idx) => idx.index.distinct_sources(),
            _ => 0,
        }
    }

    pub async fn stats(&self) -> CorpusStats {
        match &*self.state.read().await {
            EngineState::Ready(idx) => CorpusStats {
                ready: true,
                documents: idx.index.distinct_sources(),
                chunks: idx.index.len(),
                vocabulary_size: idx.model.vocabulary_size(),
                fingerprint: Some(idx.fingerprint.clone()),
                built_at: Some(idx.built_at),
            },
            _ => CorpusStats::default(),
        }
    }

    /// Restore a matching snapshot if one exists, without ever rebuilding.
    /// Returns whether the engine is ready afterwards.
    pub async fn load_cached(&self) -> AppResult<bool> {
        if matches!(&*self.state.read().await, EngineState::Ready(_)) {
            return Ok(true);
        }

        let files = match corpus::scan_corpus(&self.config.corpus_dir()) {
            Ok((files, _)) => files,
            Err(AppError::Validation(msg)) => {
                tracing::debug!("Cannot scan corpus: {}", msg);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let fingerprint = cache::compute_fingerprint(&files);
        match self.cache.try_restore(&fingerprint, &self.config.retrieval) {
            Some(snap) => {
                let corpus_index = Arc::new(CorpusIndex::from_snapshot(snap));
                *self.state.write().await = EngineState::Ready(corpus_index);
                tracing::debug!("Loaded index from snapshot");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the persisted snapshot and reset to `Uninitialized`.
    pub async fn clean(&self) -> AppResult<()> {
        self.cache.clear()?;
        *self.state.write().await = EngineState::Uninitialized;
        tracing::info!("Removed persisted index state");
        Ok(())
    }

    /// Load, chunk, fit, and embed the whole corpus.
    ///
    /// Documents that fail extraction are skipped with a warning; the rest
    /// of the corpus still indexes. Chunks are processed in scan order so
    /// vocabulary indices and index insertion order are reproducible.
    fn build_corpus_index(
        &self,
        files: &[CorpusFile],
        fingerprint: &str,
    ) -> AppResult<(CorpusIndex, Vec<String>)> {
        let mut warnings = Vec::new();
        let mut chunks: Vec<Chunk> = Vec::new();

        for file in files {
            let text = match loader::extract_text(file) {
                Ok(text) => text,
                Err(e) => {
                    let msg = format!("Skipped {}: {}", file.source, e);
                    tracing::warn!("{}", msg);
                    warnings.push(msg);
                    continue;
                }
            };

            let file_chunks = self.chunker.chunk(&file.source, &text);
            if file_chunks.is_empty() {
                tracing::debug!("No extractable text in {}", file.source);
            }
            chunks.extend(file_chunks);
        }

        let chunk_tokens: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();
        let model = WeightModel::build(&chunk_tokens)?;

        let mut index = VectorIndex::new();
        for (chunk, tokens) in chunks.into_iter().zip(chunk_tokens.iter()) {
            let embedding = self.embedder.embed(tokens, &model);
            index.add(chunk, embedding);
        }

        Ok((
            CorpusIndex {
                fingerprint: fingerprint.to_string(),
                built_at: Utc::now(),
                model,
                index,
            },
            warnings,
        ))
    }
}
