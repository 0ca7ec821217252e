use std::sync::atomic::{AtomicUsize, Ordering};

use docsearch_core::config::{Metric, VectorBackend, VectorConfig};
use docsearch_core::traits::{Embedder, VectorIndex, VectorStoreFactory};
use docsearch_core::types::Chunk;
use docsearch_embed::HashingEmbedder;
use docsearch_vector::manifest::MANIFEST_FILE;
use docsearch_vector::{FlatVectorStore, PersistentVectorStoreFactory, StoreManifest};
use tempfile::TempDir;

/// Hashing embedder that counts how many texts it was asked to embed.
struct CountingEmbedder {
    inner: HashingEmbedder,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new(dim: usize) -> Self { Self { inner: HashingEmbedder::new(dim), calls: AtomicUsize::new(0) } }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Embedder for CountingEmbedder {
    fn id(&self) -> &str { self.inner.id() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
    }
}

fn chunks(texts: &[&str]) -> Vec<Chunk> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk {
            id: format!("doc.txt:{i}"),
            ordinal: i,
            source: "doc.txt".into(),
            title: "doc".into(),
            page: None,
            content: t.to_string(),
            overlap: 0,
            chunk_index: i,
        })
        .collect()
}

const CORPUS: &[&str] = &[
    "water purification with sand filters",
    "boiling water kills most pathogens",
    "solar panels charge the battery bank",
    "seed saving for next season tomatoes",
];

fn factory(backend: VectorBackend, rebuild_on_change: bool) -> PersistentVectorStoreFactory {
    PersistentVectorStoreFactory::new(VectorConfig { backend, rebuild_on_change, ..VectorConfig::default() }, 2)
}

fn ranking(index: &dyn VectorIndex, embedder: &dyn Embedder, query: &str) -> Vec<(String, f32)> {
    let q = embedder.embed(query).expect("embed");
    index.search_vec(&q, 4).expect("search").into_iter().map(|h| (h.id, h.score)).collect()
}

#[test]
fn flat_store_persists_and_reloads_with_identical_rankings() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = CountingEmbedder::new(4096);
    let corpus = chunks(CORPUS);

    let built = factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &corpus, &embedder).expect("build");
    assert_eq!(built.len(), 4);
    assert!(tmp.path().join(MANIFEST_FILE).exists());
    let before = ranking(built.as_ref(), &embedder, "water filters");
    assert_eq!(before[0].0, "doc.txt:0");

    let embedded_during_build = embedder.calls();
    let reloaded = factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &corpus, &embedder).expect("reload");
    assert_eq!(embedder.calls(), embedded_during_build, "reuse must not embed the corpus again");
    assert_eq!(ranking(reloaded.as_ref(), &embedder, "water filters"), before);
}

#[test]
fn manifest_records_what_was_built() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = HashingEmbedder::new(64);
    factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &chunks(CORPUS), &embedder).expect("build");
    let m = StoreManifest::read(tmp.path()).expect("read").expect("manifest");
    assert_eq!(m.backend, VectorBackend::Flat);
    assert_eq!(m.metric, Metric::Cosine);
    assert_eq!(m.dim, 64);
    assert_eq!(m.count, 4);
    assert_eq!(m.embedder_id, "hashing:d64");
}

#[test]
fn store_without_manifest_is_rebuilt() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = CountingEmbedder::new(64);
    let corpus = chunks(CORPUS);
    factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &corpus, &embedder).expect("build");
    std::fs::remove_file(tmp.path().join(MANIFEST_FILE)).expect("rm manifest");

    let before = embedder.calls();
    factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &corpus, &embedder).expect("rebuild");
    assert!(embedder.calls() > before);
}

#[test]
fn changed_sources_reuse_unless_rebuild_on_change() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = CountingEmbedder::new(64);
    factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &chunks(CORPUS), &embedder).expect("build");

    let changed = chunks(&["entirely new content", "and another chunk"]);
    let calls = embedder.calls();
    let stale = factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &changed, &embedder).expect("reuse");
    assert_eq!(embedder.calls(), calls);
    assert_eq!(stale.len(), 4);

    let fresh = factory(VectorBackend::Flat, true).open_or_build(tmp.path(), &changed, &embedder).expect("rebuild");
    assert_eq!(fresh.len(), 2);
    assert_eq!(StoreManifest::read(tmp.path()).expect("read").expect("manifest").count, 2);
}

#[test]
fn dimension_change_forces_rebuild() {
    let tmp = TempDir::new().expect("tmp");
    let corpus = chunks(CORPUS);
    factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &corpus, &HashingEmbedder::new(2048)).expect("build");

    let wider = CountingEmbedder::new(4096);
    let store = factory(VectorBackend::Flat, false).open_or_build(tmp.path(), &corpus, &wider).expect("rebuild");
    assert!(wider.calls() >= corpus.len());
    assert_eq!(ranking(store.as_ref(), &wider, "tomatoes")[0].0, "doc.txt:3");
}

#[test]
fn empty_corpus_returns_an_empty_store_without_touching_disk() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path().join("vectors");
    let store = factory(VectorBackend::Flat, false).open_or_build(&dir, &[], &HashingEmbedder::new(16)).expect("empty");
    assert!(store.is_empty());
    assert!(!dir.exists());
}

#[test]
fn dot_product_prefers_longer_vectors_cosine_does_not() {
    let corpus = chunks(&["a", "b"]);
    let vectors = vec![vec![1.0, 0.0], vec![3.0, 0.1]];
    let q = [1.0, 0.0];

    let cosine = FlatVectorStore::new(&corpus, vectors.clone(), Metric::Cosine, 2);
    assert_eq!(cosine.search_vec(&q, 1).expect("search")[0].id, "doc.txt:0");

    let dot = FlatVectorStore::new(&corpus, vectors, Metric::Dot, 2);
    assert_eq!(dot.search_vec(&q, 1).expect("search")[0].id, "doc.txt:1");
}

#[test]
fn lance_backend_round_trips_and_matches_flat_ranking() {
    let flat_dir = TempDir::new().expect("tmp");
    let lance_dir = TempDir::new().expect("tmp");
    let embedder = CountingEmbedder::new(128);
    let corpus = chunks(CORPUS);

    let flat = factory(VectorBackend::Flat, false).open_or_build(flat_dir.path(), &corpus, &embedder).expect("flat");
    let lance = factory(VectorBackend::Lance, false).open_or_build(lance_dir.path(), &corpus, &embedder).expect("lance");
    assert_eq!(lance.len(), 4);
    let expected = ranking(flat.as_ref(), &embedder, "boiling water");
    let got = ranking(lance.as_ref(), &embedder, "boiling water");
    assert_eq!(got.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>(), expected.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>());
    drop(lance);

    let calls = embedder.calls();
    let reopened = factory(VectorBackend::Lance, false).open_or_build(lance_dir.path(), &corpus, &embedder).expect("reopen");
    assert_eq!(embedder.calls(), calls);
    assert_eq!(ranking(reopened.as_ref(), &embedder, "boiling water"), got);
}

#[test]
fn forced_build_re_embeds_even_when_the_store_is_usable() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = CountingEmbedder::new(64);
    let corpus = chunks(CORPUS);
    let f = factory(VectorBackend::Flat, false);
    f.open_or_build(tmp.path(), &corpus, &embedder).expect("build");
    let calls = embedder.calls();
    let rebuilt = f.build(tmp.path(), &corpus, &embedder).expect("forced");
    assert_eq!(embedder.calls(), calls + corpus.len());
    assert_eq!(rebuilt.len(), 4);
}

#[test]
fn lance_rebuild_keeps_serving_the_previous_handle() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = HashingEmbedder::new(128);
    let f = factory(VectorBackend::Lance, false);
    let old = f.open_or_build(tmp.path(), &chunks(CORPUS), &embedder).expect("build");
    let new = f.build(tmp.path(), &chunks(&["fresh corpus text"]), &embedder).expect("rebuild");
    assert_eq!(new.len(), 1);
    assert_eq!(old.len(), 4);
    let q = embedder.embed("seed tomatoes").expect("embed");
    assert_eq!(old.search_vec(&q, 4).expect("old search").len(), 4);
    assert_eq!(new.search_vec(&q, 4).expect("new search").len(), 1);
}
