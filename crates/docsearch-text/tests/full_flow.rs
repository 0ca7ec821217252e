use docsearch_core::traits::KeywordIndex;
use docsearch_core::types::{Chunk, SourceKind};
use docsearch_text::TantivyKeywordIndex;
use tempfile::TempDir;

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

#[test]
fn mammals_query_returns_both_mammal_chunks_in_insertion_order() {
    let index = TantivyKeywordIndex::in_memory(&chunks(&["cats are mammals", "dogs are mammals", "rockets are vehicles"])).expect("index");
    let hits = index.search("mammals", 2).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["doc.txt:0", "doc.txt:1"]);
    assert!(hits.iter().all(|h| h.source == SourceKind::Keyword));
    assert!((hits[0].score - hits[1].score).abs() < 1e-6, "identical documents tie");
}

#[test]
fn unique_term_ranks_first() {
    let index = TantivyKeywordIndex::in_memory(&chunks(&[
        "the reactor coolant loop is monitored daily",
        "coolant levels and reactor status",
        "quartermaster inventory for the depot",
        "reactor maintenance schedule",
    ]))
    .expect("index");
    let hits = index.search("quartermaster", 5).expect("search");
    assert_eq!(hits[0].id, "doc.txt:2");
    assert_eq!(hits.len(), 1);
}

#[test]
fn scores_are_non_increasing_and_term_frequency_saturates() {
    let index = TantivyKeywordIndex::in_memory(&chunks(&[
        "fire",
        "fire fire fire fire fire fire fire fire",
        "fire safety and fire drills",
        "water",
    ]))
    .expect("index");
    let hits = index.search("fire", 10).expect("search");
    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn zero_k_empty_corpus_and_stopword_queries_return_nothing() {
    let index = TantivyKeywordIndex::in_memory(&chunks(&["cats are mammals"])).expect("index");
    assert!(index.search("cats", 0).expect("search").is_empty());
    assert!(index.search("the are", 3).expect("search").is_empty());

    let empty = TantivyKeywordIndex::in_memory(&[]).expect("index");
    assert!(empty.is_empty());
    assert!(empty.search("cats", 3).expect("search").is_empty());
}

#[test]
fn query_syntax_characters_do_not_fail() {
    let index = TantivyKeywordIndex::in_memory(&chunks(&["what is (this) thing: a test"])).expect("index");
    let hits = index.search("what's (this thing: \"test", 3).expect("lenient parse");
    assert!(hits.len() <= 1);
    assert_eq!(index.search("thing", 3).expect("search").len(), 1);
}

#[test]
fn on_disk_index_recreates_directory() {
    let tmp = TempDir::new().expect("tmp");
    let dir = tmp.path().join("bm25");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(dir.join("stale.txt"), "old").expect("write");

    let index = TantivyKeywordIndex::create_in_dir(dir.clone(), &chunks(&["alpha bravo", "charlie delta"])).expect("index");
    assert!(!dir.join("stale.txt").exists());
    assert_eq!(index.search("charlie", 3).expect("search")[0].id, "doc.txt:1");
}

#[test]
fn ties_beyond_k_are_cut_by_ordinal_not_index_position() {
    let n = 5_000;
    let corpus: Vec<Chunk> = (0..n)
        .rev()
        .map(|ordinal| Chunk {
            id: format!("doc.txt:{ordinal}"),
            ordinal,
            source: "doc.txt".into(),
            title: "doc".into(),
            page: None,
            content: "mammals".into(),
            overlap: 0,
            chunk_index: ordinal,
        })
        .collect();
    let index = TantivyKeywordIndex::in_memory(&corpus).expect("index");
    let hits = index.search("mammals", 3).expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["doc.txt:0", "doc.txt:1", "doc.txt:2"]);
}
