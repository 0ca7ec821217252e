use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use docsearch_core::config::{resolve_with_base, Config, Settings};
use docsearch_core::loader::collect_sources;
use docsearch_core::report::format_outcome;
use docsearch_core::types::SearchMode;
use docsearch_embed::build_embedder;
use docsearch_hybrid::{RetrievalChain, SourceSpec};
use docsearch_vector::StoreManifest;

#[derive(Parser, Debug)]
#[command(name = "docsearch", version, about = "Hybrid keyword + semantic search over local documents")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, chunk and index the source documents
    Ingest {
        /// Directory to index instead of data.source_dir
        #[arg(long, env = "DOCSEARCH_SOURCE_DIR")]
        source_dir: Option<PathBuf>,
        /// Re-embed even if a persisted vector store is usable
        #[arg(long)]
        rebuild: bool,
    },
    /// Query the indexed documents
    Search {
        query: String,
        #[arg(short, long, default_value_t = SearchMode::Semantic)]
        mode: SearchMode,
        /// Number of results (defaults to retrieval.k)
        #[arg(short)]
        k: Option<usize>,
        #[arg(long, env = "DOCSEARCH_SOURCE_DIR")]
        source_dir: Option<PathBuf>,
        /// Print the outcome as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Show configuration and the persisted vector store
    Status {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn sources(chain: &RetrievalChain, source_dir: Option<PathBuf>) -> SourceSpec {
    source_dir.map(SourceSpec::Directory).unwrap_or_else(|| chain.default_sources())
}

fn chain(settings: Settings) -> Result<RetrievalChain> {
    let embedder = build_embedder(&settings.embedding).context("building embedder")?;
    Ok(RetrievalChain::new(settings, Arc::from(embedder))?)
}

fn status(settings: &Settings, json: bool) -> Result<()> {
    let base = PathBuf::from(".");
    let source_dir = resolve_with_base(&base, &settings.data.source_dir);
    let vector_dir = resolve_with_base(&base, &settings.data.vector_dir);
    let files = if source_dir.is_dir() { collect_sources(&source_dir, &settings.data.extensions).len() } else { 0 };
    let manifest = StoreManifest::read(&vector_dir)?;
    if json {
        let value = serde_json::json!({
            "source_dir": source_dir,
            "source_files": files,
            "vector_dir": vector_dir,
            "vector_store": manifest,
            "embedding_provider": settings.embedding.provider,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("source dir:   {} ({} files)", source_dir.display(), files);
    println!("vector dir:   {}", vector_dir.display());
    match manifest {
        Some(m) => println!(
            "vector store: {:?}/{:?}, {} entries, dim {}, embedder {}, built {}",
            m.backend, m.metric, m.count, m.dim, m.embedder_id, m.created_at
        ),
        None => println!("vector store: none (run `docsearch ingest`)"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = Config::load()?.settings()?;

    match cli.command {
        Command::Ingest { source_dir, rebuild } => {
            let chain = chain(settings)?;
            let spec = sources(&chain, source_dir);
            let stats = if rebuild { chain.rebuild(&spec)? } else { chain.initialize(&spec)? };
            println!("Indexed {} documents into {} chunks ({} vectors)", stats.documents, stats.chunks, stats.vectors);
        }
        Command::Search { query, mode, k, source_dir, json } => {
            let k = k.unwrap_or(settings.retrieval.k);
            let chain = chain(settings)?;
            chain.initialize(&sources(&chain, source_dir))?;
            tracing::debug!(%mode, k, "running search");
            let outcome = chain.search(&query, mode, k)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", format_outcome(&outcome));
            }
        }
        Command::Status { json } => status(&settings, json)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_parses_mode_and_k() {
        let cli = Cli::try_parse_from(["docsearch", "search", "water filters", "--mode", "hybrid", "-k", "3", "--json"]).unwrap();
        match cli.command {
            Command::Search { query, mode, k, json, .. } => {
                assert_eq!(query, "water filters");
                assert_eq!(mode, SearchMode::Hybrid);
                assert_eq!(k, Some(3));
                assert!(json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn search_mode_defaults_to_semantic() {
        let cli = Cli::try_parse_from(["docsearch", "search", "q"]).unwrap();
        assert!(matches!(cli.command, Command::Search { mode: SearchMode::Semantic, k: None, .. }));
    }
}
