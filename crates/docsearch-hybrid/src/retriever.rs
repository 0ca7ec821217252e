use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use docsearch_core::traits::{Embedder, KeywordIndex, VectorIndex};
use docsearch_core::types::{ChunkId, RetrievalWarning, SearchHit, SourceKind};

use crate::fusion::{fuse, FusedHit, WeightedList};

/// BM25 retriever with its depth fixed at construction.
#[derive(Clone)]
pub struct KeywordRetriever {
    index: Arc<dyn KeywordIndex>,
    k: usize,
}

impl KeywordRetriever {
    pub fn new(index: Arc<dyn KeywordIndex>, k: usize) -> Self {
        Self { index, k }
    }

    pub fn k(&self) -> usize { self.k }

    pub fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.index.search(query, self.k)
    }
}

/// Embeds the query and ranks by vector similarity.
#[derive(Clone)]
pub struct SemanticRetriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl SemanticRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let query_vec = self.embedder.embed(query)?;
        self.index.search_vec(&query_vec, k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub keyword: f32,
    pub vector: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { keyword: 0.5, vector: 0.5 }
    }
}

/// Result of a hybrid query that reached at least one sub-retriever.
#[derive(Debug, Clone)]
pub struct HybridHits {
    pub hits: Vec<FusedHit>,
    pub warnings: Vec<RetrievalWarning>,
}

/// Fetches `max(candidates, k)` hits from each side, then fuses them by
/// weighted normalized score.
#[derive(Clone)]
pub struct HybridRetriever {
    keyword: Arc<dyn KeywordIndex>,
    semantic: SemanticRetriever,
    candidates: usize,
    weights: FusionWeights,
}

impl HybridRetriever {
    pub fn new(keyword: Arc<dyn KeywordIndex>, semantic: SemanticRetriever, candidates: usize, weights: FusionWeights) -> Self {
        Self { keyword, semantic, candidates, weights }
    }

    /// `Err` carries both failure messages when neither side answered.
    pub fn retrieve(&self, query: &str, k: usize, ordinals: &HashMap<ChunkId, usize>) -> std::result::Result<HybridHits, String> {
        let depth = self.candidates.max(k);
        let keyword = self.keyword.search(query, depth);
        let vector = self.semantic.retrieve(query, depth);

        let mut warnings = Vec::new();
        let mut lists: Vec<WeightedList<'_>> = Vec::with_capacity(2);
        let mut failures: Vec<String> = Vec::new();

        match &keyword {
            Ok(hits) => lists.push(WeightedList { hits, weight: self.weights.keyword }),
            Err(e) => {
                let message = format!("{e:#}");
                tracing::warn!(error = %message, "keyword retriever failed; continuing with vector results");
                failures.push(format!("keyword: {message}"));
                warnings.push(RetrievalWarning { source: SourceKind::Keyword, message });
            }
        }
        match &vector {
            Ok(hits) => lists.push(WeightedList { hits, weight: self.weights.vector }),
            Err(e) => {
                let message = format!("{e:#}");
                tracing::warn!(error = %message, "vector retriever failed; continuing with keyword results");
                failures.push(format!("vector: {message}"));
                warnings.push(RetrievalWarning { source: SourceKind::Vector, message });
            }
        }

        if lists.is_empty() {
            return Err(failures.join("; "));
        }
        tracing::debug!(
            keyword = keyword.as_ref().map(Vec::len).unwrap_or(0),
            vector = vector.as_ref().map(Vec::len).unwrap_or(0),
            "fusing candidate lists"
        );
        Ok(HybridHits { hits: fuse(&lists, ordinals, k), warnings })
    }
}
