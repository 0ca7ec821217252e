//! The retrieval chain: owns the current index set and answers queries.
//!
//! Indexes are built off to the side and swapped in whole. Queries clone the
//! current `Arc` and never wait on a rebuild; a rebuild in progress keeps the
//! previous index set serving until the swap.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use serde::Serialize;

use docsearch_core::chunking::build_splitter;
use docsearch_core::config::{resolve_with_base, Settings};
use docsearch_core::error::{Error, Result};
use docsearch_core::loader::{collect_sources, default_loaders, load_documents};
use docsearch_core::report::format_outcome;
use docsearch_core::traits::{DocumentLoader, Embedder, KeywordIndex, TextSplitter, VectorIndex, VectorStoreFactory};
use docsearch_core::types::{Chunk, ChunkId, RankedResults, RetrievalResult, SearchHit, SearchMode, SearchOutcome};
use docsearch_text::TantivyKeywordIndex;
use docsearch_vector::build_vector_factory;

use crate::fusion::normalize;
use crate::retriever::{FusionWeights, HybridRetriever, KeywordRetriever, SemanticRetriever};

/// Where the corpus comes from.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// Every file under the directory with a configured extension.
    Directory(PathBuf),
    /// An explicit list of files.
    Files(Vec<PathBuf>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub vectors: usize,
}

/// One complete, immutable index generation.
struct Indexes {
    chunks: Vec<Chunk>,
    ordinals: HashMap<ChunkId, usize>,
    keyword: KeywordRetriever,
    semantic: SemanticRetriever,
    hybrid: HybridRetriever,
    stats: IndexStats,
}

impl Indexes {
    fn chunk(&self, id: &str) -> Option<&Chunk> {
        self.ordinals.get(id).and_then(|&i| self.chunks.get(i))
    }

    /// Attach chunks to scored ids, assigning 1-based ranks. Ids that do not
    /// resolve are dropped.
    fn results(&self, scored: impl IntoIterator<Item = (ChunkId, f32)>) -> Vec<RetrievalResult> {
        scored
            .into_iter()
            .filter_map(|(id, score)| self.chunk(&id).map(|c| (c.clone(), score)))
            .enumerate()
            .map(|(i, (chunk, score))| RetrievalResult { rank: i + 1, score, chunk })
            .collect()
    }

    fn normalized(&self, hits: Vec<SearchHit>) -> Vec<RetrievalResult> {
        let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
        self.results(hits.into_iter().map(|h| h.id).zip(normalize(&scores)))
    }
}

type KeywordBuilder = Box<dyn Fn(&[Chunk]) -> anyhow::Result<Arc<dyn KeywordIndex>> + Send + Sync>;

pub struct RetrievalChain {
    settings: Settings,
    base_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    loaders: Vec<Box<dyn DocumentLoader>>,
    splitter: Box<dyn TextSplitter>,
    vector_factory: Box<dyn VectorStoreFactory>,
    keyword_builder: Option<KeywordBuilder>,
    current: RwLock<Option<Arc<Indexes>>>,
    rebuild_lock: Mutex<()>,
}

impl RetrievalChain {
    /// Validates `settings` and wires the configured components. Relative
    /// paths in the settings resolve against the working directory.
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        settings.validate()?;
        let splitter = build_splitter(&settings.chunking)?;
        let loaders = default_loaders(&settings.data.pdftotext);
        let vector_factory = build_vector_factory(&settings.vector, settings.embedding.batch_size);
        Ok(Self {
            settings,
            base_dir: PathBuf::from("."),
            embedder,
            loaders,
            splitter,
            vector_factory,
            keyword_builder: None,
            current: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        })
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_loaders(mut self, loaders: Vec<Box<dyn DocumentLoader>>) -> Self {
        self.loaders = loaders;
        self
    }

    pub fn with_vector_factory(mut self, factory: Box<dyn VectorStoreFactory>) -> Self {
        self.vector_factory = factory;
        self
    }

    /// Replace how keyword indexes are built, e.g. to inject a failing one.
    pub fn with_keyword_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&[Chunk]) -> anyhow::Result<Arc<dyn KeywordIndex>> + Send + Sync + 'static,
    {
        self.keyword_builder = Some(Box::new(builder));
        self
    }

    fn build_keyword_index(&self, chunks: &[Chunk]) -> anyhow::Result<Arc<dyn KeywordIndex>> {
        if let Some(builder) = &self.keyword_builder {
            return builder(chunks);
        }
        let index = match self.settings.data.keyword_index_path(&self.base_dir) {
            Some(dir) => TantivyKeywordIndex::create_in_dir(dir, chunks)?,
            None => TantivyKeywordIndex::in_memory(chunks)?,
        };
        Ok(Arc::new(index))
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn vector_dir(&self) -> PathBuf {
        resolve_with_base(&self.base_dir, &self.settings.data.vector_dir)
    }

    /// The configured source directory.
    pub fn default_sources(&self) -> SourceSpec {
        SourceSpec::Directory(resolve_with_base(&self.base_dir, &self.settings.data.source_dir))
    }

    /// Load, chunk and index `sources`, reusing a persisted vector store when
    /// it is still valid.
    pub fn initialize(&self, sources: &SourceSpec) -> Result<IndexStats> {
        self.build_and_swap(sources, false)
    }

    /// Like [`initialize`](Self::initialize) but always re-embeds. Queries keep
    /// using the previous index set until the new one is complete.
    pub fn rebuild(&self, sources: &SourceSpec) -> Result<IndexStats> {
        self.build_and_swap(sources, true)
    }

    /// Stats of the index set currently serving queries.
    pub fn status(&self) -> Option<IndexStats> {
        self.snapshot().map(|i| i.stats)
    }

    fn snapshot(&self) -> Option<Arc<Indexes>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn build_and_swap(&self, sources: &SourceSpec, force: bool) -> Result<IndexStats> {
        let _exclusive = self.rebuild_lock.lock().unwrap_or_else(|p| p.into_inner());
        let start = Instant::now();
        let indexes = Arc::new(self.build_indexes(sources, force)?);
        let stats = indexes.stats;
        match self.current.write() {
            Ok(mut guard) => *guard = Some(indexes),
            Err(poisoned) => *poisoned.into_inner() = Some(indexes),
        }
        tracing::info!(
            documents = stats.documents,
            chunks = stats.chunks,
            vectors = stats.vectors,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Index set ready"
        );
        Ok(stats)
    }

    fn resolve_sources(&self, sources: &SourceSpec) -> Result<Vec<PathBuf>> {
        match sources {
            SourceSpec::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(Error::Config(format!("source directory {} does not exist", dir.display())));
                }
                Ok(collect_sources(dir, &self.settings.data.extensions))
            }
            SourceSpec::Files(files) => {
                if files.is_empty() {
                    return Err(Error::Config("no source files given".into()));
                }
                Ok(files.clone())
            }
        }
    }

    fn build_indexes(&self, sources: &SourceSpec, force: bool) -> Result<Indexes> {
        let paths = self.resolve_sources(sources)?;
        let docs = load_documents(&paths, &self.loaders);
        let chunks = self.splitter.split_documents(&docs);
        tracing::info!(files = paths.len(), documents = docs.len(), chunks = chunks.len(), "Corpus chunked");
        if chunks.is_empty() {
            tracing::warn!("no documents could be loaded; searches will report an empty corpus");
        }

        let keyword = self.build_keyword_index(&chunks).map_err(|e| Error::Index(format!("keyword index: {e:#}")))?;
        let dir = self.vector_dir();
        let vector: Arc<dyn VectorIndex> = if force {
            self.vector_factory.build(&dir, &chunks, self.embedder.as_ref())
        } else {
            self.vector_factory.open_or_build(&dir, &chunks, self.embedder.as_ref())
        }
        .map(Arc::from)
        .map_err(|e| Error::Index(format!("vector index: {e:#}")))?;

        let retrieval = &self.settings.retrieval;
        let semantic = SemanticRetriever::new(vector.clone(), self.embedder.clone());
        let weights = FusionWeights { keyword: retrieval.keyword_weight, vector: retrieval.vector_weight };
        let stats = IndexStats { documents: docs.len(), chunks: chunks.len(), vectors: vector.len() };
        let ordinals = chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        Ok(Indexes {
            keyword: KeywordRetriever::new(keyword.clone(), retrieval.k),
            hybrid: HybridRetriever::new(keyword, semantic.clone(), retrieval.candidates, weights),
            semantic,
            ordinals,
            chunks,
            stats,
        })
    }

    /// Run `query` in `mode`, returning at most `k` results.
    ///
    /// Keyword mode returns the retriever's fixed depth (`retrieval.k`)
    /// regardless of `k`.
    pub fn search(&self, query: &str, mode: SearchMode, k: usize) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::MalformedQuery("query is empty".into()));
        }
        let indexes = self.snapshot().ok_or(Error::NotInitialized)?;
        if indexes.chunks.is_empty() {
            return Ok(SearchOutcome::NoDocuments);
        }
        let start = Instant::now();
        let (results, warnings) = match mode {
            SearchMode::Keyword => {
                if k != indexes.keyword.k() {
                    tracing::debug!(requested = k, fixed = indexes.keyword.k(), "keyword retriever depth is fixed; ignoring requested k");
                }
                let hits = indexes
                    .keyword
                    .retrieve(query)
                    .map_err(|e| Error::RetrievalUnavailable(format!("keyword: {e:#}")))?;
                (indexes.normalized(hits), Vec::new())
            }
            SearchMode::Semantic => {
                let hits = indexes
                    .semantic
                    .retrieve(query, k)
                    .map_err(|e| Error::RetrievalUnavailable(format!("vector: {e:#}")))?;
                (indexes.normalized(hits), Vec::new())
            }
            SearchMode::Hybrid => {
                let fused = indexes.hybrid.retrieve(query, k, &indexes.ordinals).map_err(Error::RetrievalUnavailable)?;
                (indexes.results(fused.hits.into_iter().map(|h| (h.id, h.score))), fused.warnings)
            }
        };
        tracing::debug!(%mode, results = results.len(), elapsed_ms = start.elapsed().as_millis() as u64, "query answered");
        Ok(SearchOutcome::Ranked(RankedResults { mode, results, warnings }))
    }

    pub fn search_keyword(&self, query: &str) -> Result<SearchOutcome> {
        self.search(query, SearchMode::Keyword, self.settings.retrieval.k)
    }

    pub fn search_semantic(&self, query: &str, k: usize) -> Result<SearchOutcome> {
        self.search(query, SearchMode::Semantic, k)
    }

    pub fn search_hybrid(&self, query: &str, k: usize) -> Result<SearchOutcome> {
        self.search(query, SearchMode::Hybrid, k)
    }

    /// Markdown report for `query`.
    pub fn search_report(&self, query: &str, mode: SearchMode, k: usize) -> Result<String> {
        Ok(format_outcome(&self.search(query, mode, k)?))
    }
}
