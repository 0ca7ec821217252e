use std::path::PathBuf;

use docsearch_core::config::Config;
use docsearch_vector::StoreManifest;

// Print the manifest of the configured vector store.
// Usage:
//   cargo run -p docsearch-vector --example status -- [vector_dir]

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| docsearch_core::config::expand_path(&settings.data.vector_dir));
    match StoreManifest::read(&dir)? {
        Some(m) => println!(
            "{}: backend={:?} metric={:?} dim={} count={} embedder={} built={}",
            dir.display(),
            m.backend,
            m.metric,
            m.dim,
            m.count,
            m.embedder_id,
            m.created_at
        ),
        None => println!("{}: no vector store", dir.display()),
    }
    Ok(())
}
