use docsearch_core::config::Config;
use docsearch_embed::build_embedder;

// Embed a couple of strings with whichever provider the config selects.
// Usage:
//   APP_USE_FAKE_EMBEDDINGS=1 cargo run -p docsearch-embed --example embed -- "some text" "more text"

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = build_embedder(&settings.embedding)?;
    let mut texts: Vec<String> = std::env::args().skip(1).collect();
    if texts.is_empty() {
        texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    }
    let embs = embedder.embed_batch(&texts)?;
    println!("provider={} B={} dim={}", embedder.id(), embs.len(), embedder.dim());
    for (text, v) in texts.iter().zip(&embs) {
        let head: Vec<String> = v.iter().take(4).map(|x| format!("{x:.3}")).collect();
        println!("  {text:?} -> [{} ...]", head.join(", "));
    }
    Ok(())
}
