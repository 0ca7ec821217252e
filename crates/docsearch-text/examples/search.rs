use std::env;
use std::path::PathBuf;

use docsearch_core::chunking::build_splitter;
use docsearch_core::config::ChunkingConfig;
use docsearch_core::loader::{collect_sources, default_loaders, load_documents};
use docsearch_core::traits::KeywordIndex;
use docsearch_text::TantivyKeywordIndex;

// Build an in-memory BM25 index over a directory and run one query.
// Usage:
//   cargo run -p docsearch-text --example search -- <dir> "<query>" [k]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("Usage: search <dir> <query> [k]");
        std::process::exit(2);
    }
    let dir = PathBuf::from(&args[0]);
    let query = &args[1];
    let k = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5);

    let sources = collect_sources(&dir, &["pdf".into(), "txt".into(), "md".into()]);
    let docs = load_documents(&sources, &default_loaders("pdftotext"));
    let chunks = build_splitter(&ChunkingConfig::default())?.split_documents(&docs);
    let index = TantivyKeywordIndex::in_memory(&chunks)?;

    println!("{} chunks from {} files", chunks.len(), docs.len());
    for (i, hit) in index.search(query, k)?.iter().enumerate() {
        println!("  {}. score={:.4}  id={}", i + 1, hit.score, hit.id);
    }
    Ok(())
}
