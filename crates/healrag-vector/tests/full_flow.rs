use std::cell::Cell;

use healrag_core::types::Chunk;
use healrag_embed::HashEmbedder;
use healrag_vector::{build_base_index, load_or_build, BaseIndexStore, LanceBaseStore};
use tempfile::TempDir;

fn sample_chunks() -> Vec<Chunk> {
    (0..5).map(|i| Chunk::new(format!("chunk number {i} about fire safety"), format!("kb: doc{i}.txt"))).collect()
}

#[tokio::test]
async fn lancedb_round_trip_preserves_order() {
    let tmp = TempDir::new().expect("tmp");
    let store = LanceBaseStore::new(&tmp.path().join("lancedb"), "base_chunks_test");
    assert!(store.load_async().await.expect("load empty").is_none());

    let embedder = HashEmbedder::new(64);
    let built = build_base_index(&embedder, sample_chunks()).expect("build");
    store.persist_async(&built).await.expect("persist");

    let loaded = store.load_async().await.expect("load").expect("present");
    assert_eq!(loaded.chunks(), built.chunks());
    assert_eq!(loaded.index().dim(), 64);
    for (a, b) in loaded.index().vectors().iter().zip(built.index().vectors()) {
        for (x, y) in a.iter().zip(b) { assert!((x - y).abs() < 1e-6); }
    }
}

#[test]
fn load_or_build_builds_once_then_loads() {
    let tmp = TempDir::new().expect("tmp");
    let store = LanceBaseStore::new(&tmp.path().join("lancedb"), "base_chunks");
    let embedder = HashEmbedder::new(32);
    let builds = Cell::new(0);
    let corpus = || { builds.set(builds.get() + 1); Ok(sample_chunks()) };

    let first = load_or_build(&store, &embedder, false, corpus).expect("first");
    assert_eq!(first.len(), 5);
    assert_eq!(builds.get(), 1);

    let second = load_or_build(&store, &embedder, false, || { builds.set(builds.get() + 1); Ok(sample_chunks()) }).expect("second");
    assert_eq!(second.chunks(), first.chunks());
    assert_eq!(builds.get(), 1, "cached index is reused");

    load_or_build(&store, &embedder, true, || { builds.set(builds.get() + 1); Ok(sample_chunks()) }).expect("rebuild");
    assert_eq!(builds.get(), 2, "rebuild flag forces a rebuild");
    assert!(store.load().expect("load").is_some());
}

#[test]
fn dim_change_triggers_rebuild() {
    let tmp = TempDir::new().expect("tmp");
    let store = LanceBaseStore::new(&tmp.path().join("lancedb"), "base_chunks");
    load_or_build(&store, &HashEmbedder::new(16), false, || Ok(sample_chunks())).expect("first");
    let rebuilt = load_or_build(&store, &HashEmbedder::new(24), false, || Ok(sample_chunks())).expect("second");
    assert_eq!(rebuilt.index().dim(), 24);
}

#[test]
fn empty_corpus_is_an_error() {
    let tmp = TempDir::new().expect("tmp");
    let store = LanceBaseStore::new(&tmp.path().join("lancedb"), "base_chunks");
    assert!(load_or_build(&store, &HashEmbedder::new(8), true, || Ok(Vec::new())).is_err());
}
