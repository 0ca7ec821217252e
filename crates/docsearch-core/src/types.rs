//! Domain types shared by the loaders, the indexes and the retrieval chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ChunkId = String;

/// One page of extracted text. `number` is 0-based; plain text files have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub number: Option<u32>,
    pub text: String,
}

/// A loaded source file.
///
/// - `id`: the source path, which is also the document identity
/// - `title`: display title (file stem unless the loader knows better)
/// - `pages`: ordered page texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub pages: Vec<PageText>,
}

impl Document {
    pub fn single_page(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), pages: vec![PageText { number: None, text: text.into() }] }
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// A bounded slice of a document's text; the unit of retrieval.
///
/// - `id`: `"<source>:<chunk_index>"`, unique across the corpus
/// - `ordinal`: insertion position in the corpus, used for stable tie-breaking
/// - `source`/`title`/`page`: copied from the parent document and page
/// - `overlap`: characters shared with the preceding chunk of the same page
/// - `chunk_index`: position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub ordinal: usize,
    pub source: String,
    pub title: String,
    pub page: Option<u32>,
    pub content: String,
    pub overlap: usize,
    pub chunk_index: usize,
}

/// Indicates which engine produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Keyword,
    Vector,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Keyword => f.write_str("keyword"),
            SourceKind::Vector => f.write_str("vector"),
        }
    }
}

/// The minimal surface returned by all engines.
///
/// `id` matches `Chunk::id`. `score` is engine-specific but higher is always
/// better. `source` labels the origin engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// Which retrieval path a query takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Keyword,
    #[default]
    Semantic,
    Hybrid,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Keyword => f.write_str("keyword"),
            SearchMode::Semantic => f.write_str("semantic"),
            SearchMode::Hybrid => f.write_str("hybrid"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" | "bm25" => Ok(SearchMode::Keyword),
            "semantic" | "vector" => Ok(SearchMode::Semantic),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(crate::error::Error::Config(format!("unknown search mode '{other}'"))),
        }
    }
}

/// A ranked chunk. `score` is normalized to 0.0–1.0, `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub rank: usize,
    pub score: f32,
    pub chunk: Chunk,
}

/// Raised when one sub-retriever failed and the query was answered without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalWarning {
    pub source: SourceKind,
    pub message: String,
}

impl fmt::Display for RetrievalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} retriever unavailable, results use the remaining retriever only: {}", self.source, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResults {
    pub mode: SearchMode,
    pub results: Vec<RetrievalResult>,
    pub warnings: Vec<RetrievalWarning>,
}

/// What a query returns. `NoDocuments` is the soft empty-corpus signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    NoDocuments,
    Ranked(RankedResults),
}

impl SearchOutcome {
    pub fn results(&self) -> &[RetrievalResult] {
        match self {
            SearchOutcome::NoDocuments => &[],
            SearchOutcome::Ranked(r) => &r.results,
        }
    }

    pub fn warnings(&self) -> &[RetrievalWarning] {
        match self {
            SearchOutcome::NoDocuments => &[],
            SearchOutcome::Ranked(r) => &r.warnings,
        }
    }
}
