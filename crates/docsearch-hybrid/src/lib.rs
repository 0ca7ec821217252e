//! Hybrid retrieval over the keyword and vector indexes.
//!
//! - [`fusion`]: per-list score normalization and weighted fusion
//! - [`retriever`]: keyword, semantic and hybrid retrievers
//! - [`chain`]: [`RetrievalChain`], the application context that owns the
//!   index set and serves the three query modes
pub mod chain;
pub mod fusion;
pub mod retriever;

pub use chain::{IndexStats, RetrievalChain, SourceSpec};
pub use retriever::{FusionWeights, HybridRetriever, KeywordRetriever, SemanticRetriever};
