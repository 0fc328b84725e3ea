//! Full-pipeline tests: corpus on disk through index, cache, and query.

use crate::engine::RetrievalEngine;
use lexrag_core::{AppConfig, AppError};
use tempfile::TempDir;

/// Engine over a temp workspace with small windows so fixtures stay short.
fn engine_for(workspace: &TempDir) -> RetrievalEngine {
    let mut config = AppConfig::default();
    config.workspace = workspace.path().to_path_buf();
    config.retrieval.chunk_size = 50;
    config.retrieval.chunk_overlap = 10;
    config.retrieval.embedding_dim = 64;
    RetrievalEngine::new(config).unwrap()
}

fn write_doc(workspace: &TempDir, name: &str, text: &str) {
    let path = workspace.path().join("documents").join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

const VEHICLE_CASE: &str = "Use of a vehicle in a public place without a permit is a \
    fundamental statutory infraction. The registered owner bears liability for any damage \
    arising from such use, and the insurance carrier may deny indemnity where the permit \
    requirement was knowingly ignored.";

const LEASE_TERMS: &str = "The lessee shall pay rent monthly in advance. A security \
    deposit equal to one month of rent is held by the lessor and refunded at the end of \
    the tenancy, less any deductions for damage beyond ordinary wear.";

#[tokio::test]
async fn test_single_document_is_top_ranked() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "insurance_liability_case.txt", VEHICLE_CASE);

    let engine = engine_for(&workspace);
    let report = engine.index(false).await.unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.chunks, 1);
    assert!(!report.from_cache);

    let results = engine
        .search("insurance liability vehicle without permit", 5)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.source, "insurance_liability_case.txt");
    assert!(
        results[0].1 > 0.0,
        "Matching chunk should score above zero: {}",
        results[0].1
    );

    let response = engine
        .query("insurance liability vehicle without permit")
        .await
        .unwrap();
    assert_eq!(response.ranked_chunks.len(), 1);
    assert_eq!(
        response.ranked_chunks[0].source,
        "insurance_liability_case.txt"
    );
    assert!(response.ranked_chunks[0].text.contains("vehicle"));
}

#[tokio::test]
async fn test_empty_corpus_never_becomes_ready() {
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(workspace.path().join("documents")).unwrap();

    let engine = engine_for(&workspace);
    let err = engine.index(false).await.unwrap_err();
    assert!(
        matches!(err, AppError::EmptyCorpus(_)),
        "Indexing an empty directory should fail with EmptyCorpus: {}",
        err
    );

    assert_eq!(engine.document_count().await, 0);

    let err = engine.query("anything at all").await.unwrap_err();
    assert!(matches!(err, AppError::NotReady(_)));
}

#[tokio::test]
async fn test_empty_query_is_rejected_in_any_state() {
    let workspace = TempDir::new().unwrap();
    let engine = engine_for(&workspace);

    // Before any index exists, validation still fires first
    let err = engine.query("").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    write_doc(&workspace, "lease.txt", LEASE_TERMS);
    engine.index(false).await.unwrap();

    let err = engine.query("   \t  ").await.unwrap_err();
    assert!(
        matches!(err, AppError::Validation(_)),
        "Whitespace-only query should fail validation, not readiness"
    );
}

#[tokio::test]
async fn test_k_larger_than_corpus_returns_everything_ranked() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "a.txt", "vehicle permits and public roads");
    write_doc(&workspace, "b.txt", "rent and security deposits");
    write_doc(&workspace, "c.txt", "notice periods for termination");

    let engine = engine_for(&workspace);
    let report = engine.index(false).await.unwrap();
    assert_eq!(report.chunks, 3);

    let results = engine.search("vehicle rent notice", 5).await.unwrap();
    assert_eq!(results.len(), 3, "k=5 against 3 chunks returns all 3");
    for pair in results.windows(2) {
        assert!(
            pair[0].1 >= pair[1].1,
            "Scores should be non-increasing: {} then {}",
            pair[0].1,
            pair[1].1
        );
    }
}

#[tokio::test]
async fn test_ranking_prefers_the_matching_document() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "vehicle.txt", VEHICLE_CASE);
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    engine.index(false).await.unwrap();

    let results = engine.search("permit for a vehicle", 2).await.unwrap();
    assert_eq!(
        results[0].0.source, "vehicle.txt",
        "Vehicle query should rank the vehicle document first"
    );

    let results = engine.search("security deposit refund", 2).await.unwrap();
    assert_eq!(
        results[0].0.source, "lease.txt",
        "Lease query should rank the lease document first"
    );
}

#[tokio::test]
async fn test_cache_round_trip_is_lossless() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "vehicle.txt", VEHICLE_CASE);
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let first = engine_for(&workspace);
    let built = first.index(false).await.unwrap();
    assert!(!built.from_cache);
    let fresh_results = first.search("vehicle permit", 5).await.unwrap();
    let fresh_stats = first.stats().await;

    // A new engine over the same workspace restores instead of rebuilding
    let second = engine_for(&workspace);
    let restored = second.index(false).await.unwrap();
    assert!(restored.from_cache, "Unchanged corpus should hit the cache");
    assert_eq!(restored.documents, built.documents);
    assert_eq!(restored.chunks, built.chunks);

    let cached_results = second.search("vehicle permit", 5).await.unwrap();
    assert_eq!(cached_results.len(), fresh_results.len());
    for (fresh, cached) in fresh_results.iter().zip(cached_results.iter()) {
        assert_eq!(fresh.0, cached.0, "Restored chunks should be identical");
        assert_eq!(fresh.1, cached.1, "Restored scores should be identical");
    }

    let cached_stats = second.stats().await;
    assert_eq!(cached_stats.fingerprint, fresh_stats.fingerprint);
    assert_eq!(cached_stats.vocabulary_size, fresh_stats.vocabulary_size);
}

#[tokio::test]
async fn test_content_change_invalidates_the_cache() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    engine.index(false).await.unwrap();

    write_doc(
        &workspace,
        "lease.txt",
        "Subletting is prohibited without prior written consent of the lessor.",
    );

    let report = engine.index(false).await.unwrap();
    assert!(
        !report.from_cache,
        "Changed content must force a rebuild, not a cache hit"
    );

    let results = engine.search("subletting consent", 1).await.unwrap();
    assert!(results[0].0.text.contains("Subletting"));
}

#[tokio::test]
async fn test_force_rebuild_bypasses_the_cache() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    engine.index(false).await.unwrap();

    let report = engine.index(true).await.unwrap();
    assert!(!report.from_cache);
}

#[tokio::test]
async fn test_unparseable_documents_become_warnings() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);
    write_doc(&workspace, "scan.pdf", "binary-ish payload");
    let broken = workspace.path().join("documents/notes.txt");
    std::fs::write(&broken, b"text with a null \x00 byte").unwrap();

    let engine = engine_for(&workspace);
    let report = engine.index(false).await.unwrap();

    assert_eq!(report.documents, 1, "Only the parseable document indexes");
    assert_eq!(report.warnings.len(), 2, "One warning per skipped file");
    assert!(report.warnings.iter().any(|w| w.contains("scan.pdf")));
    assert!(report.warnings.iter().any(|w| w.contains("notes.txt")));

    let results = engine.search("security deposit", 1).await.unwrap();
    assert_eq!(results[0].0.source, "lease.txt");
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_does_not_abort_indexing() {
    use std::os::unix::fs::PermissionsExt;

    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);
    write_doc(&workspace, "locked.txt", "no access to this one");
    let locked = workspace.path().join("documents/locked.txt");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    // Permission bits are not enforced for root
    if std::fs::read(&locked).is_ok() {
        return;
    }

    let engine = engine_for(&workspace);
    let report = engine.index(false).await.unwrap();

    assert_eq!(report.documents, 1, "Only the readable document indexes");
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("locked.txt"));

    let results = engine.search("rent", 1).await.unwrap();
    assert_eq!(results[0].0.source, "lease.txt");
}

#[tokio::test]
async fn test_failed_rebuild_keeps_the_previous_index() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    engine.index(false).await.unwrap();
    assert_eq!(engine.document_count().await, 1);

    // Empty the corpus so a forced rebuild cannot produce a model
    std::fs::remove_file(workspace.path().join("documents/lease.txt")).unwrap();
    let err = engine.index(true).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyCorpus(_)));

    assert_eq!(
        engine.document_count().await,
        1,
        "Previous index should survive the failed rebuild"
    );
    let results = engine.search("rent", 1).await.unwrap();
    assert_eq!(results[0].0.source, "lease.txt");
}

#[tokio::test]
async fn test_concurrent_index_calls_leave_the_engine_ready() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    let (first, second) = tokio::join!(engine.index(false), engine.index(false));
    first.unwrap();
    second.unwrap();

    assert_eq!(engine.document_count().await, 1);
    let results = engine.search("rent", 1).await.unwrap();
    assert_eq!(results[0].0.source, "lease.txt");
}

#[tokio::test]
async fn test_stats_reflect_readiness() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);

    let before = engine.stats().await;
    assert!(!before.ready);
    assert_eq!(before.documents, 0);
    assert!(before.fingerprint.is_none());
    assert!(before.built_at.is_none());

    engine.index(false).await.unwrap();

    let after = engine.stats().await;
    assert!(after.ready);
    assert_eq!(after.documents, 1);
    assert_eq!(after.chunks, 1);
    assert!(after.vocabulary_size > 0);
    assert!(after.fingerprint.is_some());
    assert!(after.built_at.is_some());
}

#[tokio::test]
async fn test_load_cached_restores_without_rebuilding() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let first = engine_for(&workspace);
    first.index(false).await.unwrap();

    let second = engine_for(&workspace);
    assert!(second.load_cached().await.unwrap());
    assert_eq!(second.document_count().await, 1);

    // No snapshot, no corpus: nothing to load, and no error either
    let empty_workspace = TempDir::new().unwrap();
    let third = engine_for(&empty_workspace);
    assert!(!third.load_cached().await.unwrap());
    assert!(!third.stats().await.ready);
}

#[tokio::test]
async fn test_clean_removes_all_persisted_state() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    engine.index(false).await.unwrap();
    let snapshot_path = engine.config().snapshot_path();
    assert!(snapshot_path.exists());

    engine.clean().await.unwrap();
    assert!(!snapshot_path.exists());
    assert_eq!(engine.document_count().await, 0);

    let fresh = engine_for(&workspace);
    assert!(
        !fresh.load_cached().await.unwrap(),
        "Nothing should be restorable after clean"
    );
}

#[tokio::test]
async fn test_corrupted_snapshot_triggers_silent_rebuild() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let first = engine_for(&workspace);
    first.index(false).await.unwrap();

    let snapshot_path = first.config().snapshot_path();
    std::fs::write(&snapshot_path, b"definitely not sqlite").unwrap();

    let second = engine_for(&workspace);
    let report = second.index(false).await.unwrap();
    assert!(
        !report.from_cache,
        "Corrupt snapshot should be discarded and rebuilt, not surfaced"
    );
    assert_eq!(second.document_count().await, 1);
}

#[tokio::test]
async fn test_rebuilds_are_deterministic() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "vehicle.txt", VEHICLE_CASE);
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    engine.index(true).await.unwrap();
    let first = engine.search("permit liability", 5).await.unwrap();

    engine.index(true).await.unwrap();
    let second = engine.search("permit liability", 5).await.unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1, "Scores must be bit-identical across rebuilds");
    }
}

#[tokio::test]
async fn test_structured_formats_index_as_clean_text() {
    let workspace = TempDir::new().unwrap();
    write_doc(
        &workspace,
        "agreements/service.md",
        "# Service Agreement\n\nThe provider shall maintain **uptime** of 99 percent. \
         See [Schedule A](./schedule.md) for maintenance windows.",
    );
    write_doc(
        &workspace,
        "notices/eviction.html",
        "<html><body><p>An eviction notice must give the tenant \
         fourteen days to respond.</p></body></html>",
    );

    let engine = engine_for(&workspace);
    let report = engine.index(false).await.unwrap();
    assert_eq!(report.documents, 2);

    let results = engine.search("provider uptime maintenance", 1).await.unwrap();
    assert_eq!(results[0].0.source, "agreements/service.md");
    assert!(!results[0].0.text.contains("**"), "Markup should be stripped");
    assert!(!results[0].0.text.contains("./schedule.md"));

    let results = engine.search("eviction notice tenant", 1).await.unwrap();
    assert_eq!(
        results[0].0.source, "notices/eviction.html",
        "Source identifiers keep their relative paths"
    );
    assert!(!results[0].0.text.contains('<'));
}

#[tokio::test]
async fn test_query_response_serializes_with_camel_case_key() {
    let workspace = TempDir::new().unwrap();
    write_doc(&workspace, "lease.txt", LEASE_TERMS);

    let engine = engine_for(&workspace);
    engine.index(false).await.unwrap();

    let response = engine.query("rent").await.unwrap();
    let json = serde_json::to_value(&response).unwrap();

    let ranked = json
        .get("rankedChunks")
        .expect("response JSON should use the rankedChunks key");
    assert!(ranked.is_array());
    assert!(ranked[0].get("text").is_some());
    assert!(ranked[0].get("source").is_some());
}
