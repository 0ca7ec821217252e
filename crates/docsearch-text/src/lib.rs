//! docsearch-text
//!
//! Tantivy-based BM25 keyword index over document chunks. See `index` and the
//! `search` example for ad-hoc use during development.

pub mod tantivy_utils;
pub mod index;

pub use index::TantivyKeywordIndex;
