//! End-to-end engine tests: ingest, query, compare, reload against a
//! corpus persisted in a temp directory.

use simdex::engine::{Engine, EngineConfig, IngestOutcome, SchemeOutcome};
use simdex::error::{EngineError, ExtractError};
use simdex::store::CorpusStore;
use tempfile::TempDir;

fn engine_in(dir: &TempDir) -> Engine {
    let store = CorpusStore::new(dir.path().join("corpus.json"));
    Engine::open(store, EngineConfig::default()).unwrap()
}

/// Deterministic prose, long enough to clear both fingerprint floors
/// when `lines` is large.
fn prose(seed: usize, lines: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..lines {
        out.push_str(&format!(
            "Document {seed} line {i}: pack my box with five dozen liquor \
             jugs while {i} couriers wait at the {seed} gate.\n"
        ));
    }
    out.into_bytes()
}

#[test]
fn ingest_then_query_ranks_both_schemes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);

    // a: large, both fingerprints; b: small, block fingerprint only
    let a = prose(1, 60);
    let b = prose(1, 8);
    assert!(a.len() >= 4096 && b.len() >= 50 && b.len() < 4096);

    let outcome = engine.ingest(&a, "a.txt", None).unwrap();
    let digest_a = outcome.digest().to_string();
    engine.ingest(&b, "b.txt", None).unwrap();

    let report = engine.query(&digest_a).unwrap();
    assert_eq!(report.sha256, digest_a);
    assert_eq!(report.entry.names, vec!["a.txt"]);

    // self-match tops the merged view with a perfect score on both schemes
    let top = &report.similar[0];
    assert_eq!(top.digest, digest_a);
    assert_eq!((top.block_score, top.ctph_score), (100, 100));

    // b is reachable through the block scheme only
    let other = report
        .similar
        .iter()
        .find(|s| s.digest != digest_a)
        .expect("b should appear in the merged view");
    assert!(other.block_score < 100);
    assert_eq!(other.ctph_score, 0);
}

#[test]
fn compare_degrades_to_block_only_below_the_ctph_floor() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    engine.ingest(&prose(1, 60), "a.txt", None).unwrap();

    let small = prose(1, 38);
    assert!(small.len() >= 50 && small.len() < 4096);
    let report = engine.compare(&small, "small.txt", false).unwrap();

    assert!(!report.block.matches.is_empty());
    assert!(matches!(report.ctph, SchemeOutcome::Unavailable { .. }));
    assert!(report.similar.iter().all(|s| s.ctph_score == 0));
    assert!(!report.saved);
}

#[test]
fn failed_pipeline_never_mutates_the_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);

    let err = engine.compare(&[0x41u8; 30], "tiny.bin", true).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Extract(ExtractError::TooSmall { got: 30, min: 50 })
    ));
    assert_eq!(engine.stats().entries, 0);

    // nothing was persisted either
    let reopened = engine_in(&dir);
    assert_eq!(reopened.stats().entries, 0);
}

#[test]
fn reingestion_refreshes_the_entry_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let bytes = prose(3, 60);

    let first = engine.ingest(&bytes, "orig.txt", None).unwrap();
    let digest = first.digest().to_string();
    assert!(matches!(first, IngestOutcome::Added { .. }));

    let second = engine.ingest(&bytes, "copy.txt", None).unwrap();
    assert!(matches!(second, IngestOutcome::AlreadyKnown { .. }));
    assert_eq!(second.digest(), digest);

    assert_eq!(engine.stats().entries, 1);
    let report = engine.query(&digest).unwrap();
    assert_eq!(report.entry.names, vec!["orig.txt", "copy.txt"]);
    assert!(report.entry.last_upload_date >= report.entry.first_upload_date);
}

#[test]
fn compare_with_persist_saves_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let bytes = prose(4, 60);

    let first = engine.compare(&bytes, "x.txt", true).unwrap();
    assert!(!first.already_known);
    assert!(first.saved);

    let second = engine.compare(&bytes, "x-again.txt", true).unwrap();
    assert!(second.already_known);
    assert!(!second.saved, "known content must not count as a new save");
    assert_eq!(engine.stats().entries, 1);

    // the re-upload still refreshed the alias list
    let report = engine.query(&second.sha256).unwrap();
    assert_eq!(report.entry.names, vec!["x.txt", "x-again.txt"]);
}

#[test]
fn reload_picks_up_external_database_changes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    engine.ingest(&prose(5, 60), "a.txt", None).unwrap();
    assert_eq!(engine.stats().entries, 1);

    // a second engine writing to the same store simulates an external edit
    let other = engine_in(&dir);
    other.ingest(&prose(6, 60), "b.txt", None).unwrap();

    assert_eq!(engine.stats().entries, 1, "stale until reloaded");
    let stats = engine.reload().unwrap();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.block_index, 2);
}

#[test]
fn oversized_uploads_are_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let store = CorpusStore::new(dir.path().join("corpus.json"));
    let engine = Engine::open(
        store,
        EngineConfig {
            max_upload_bytes: 1024,
            top_matches: 10,
        },
    )
    .unwrap();

    let err = engine.compare(&vec![0u8; 2048], "big.bin", false).unwrap_err();
    assert!(matches!(err, EngineError::TooLarge { size: 2048, max: 1024 }));
}
