use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::path::PathBuf;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, DocAddress, DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Score, SegmentReader, TantivyDocument};

use docsearch_core::traits::KeywordIndex;
use docsearch_core::types::{Chunk, SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer};

/// BM25 index over a fixed chunk set, built once and read-only afterwards.
pub struct TantivyKeywordIndex {
	index: Index,
	reader: IndexReader,
	id_field: Field,
	text_field: Field,
	len: usize,
}

impl TantivyKeywordIndex {
	pub fn in_memory(chunks: &[Chunk]) -> Result<Self> {
		Self::build(Index::create_in_ram(build_schema()), chunks)
	}

	/// Recreates `index_dir` and writes the index there.
	pub fn create_in_dir(index_dir: PathBuf, chunks: &[Chunk]) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(&index_dir)?; }
		std::fs::create_dir_all(&index_dir)?;
		let index = Index::create_in_dir(&index_dir, build_schema()).with_context(|| format!("creating index in {}", index_dir.display()))?;
		Self::build(index, chunks)
	}

	fn build(index: Index, chunks: &[Chunk]) -> Result<Self> {
		register_tokenizer(&index);
		let schema = index.schema();
		let id_field = schema.get_field("id")?;
		let ordinal_field = schema.get_field("ordinal")?;
		let source_field = schema.get_field("source")?;
		let text_field = schema.get_field("text")?;

		// Large corpora span several segments; tie order comes from `ordinal`, not doc addresses.
		let mut index_writer: IndexWriter = index.writer(50_000_000)?;
		for c in chunks {
			index_writer.add_document(doc!(
				id_field => c.id.clone(),
				ordinal_field => c.ordinal as u64,
				source_field => c.source.clone(),
				text_field => c.content.clone(),
			))?;
		}
		index_writer.commit()?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		tracing::info!("Keyword index built over {} chunks", chunks.len());
		Ok(Self { index, reader, id_field, text_field, len: chunks.len() })
	}
}

impl KeywordIndex for TantivyKeywordIndex {
	fn len(&self) -> usize { self.len }

	fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>> {
		if k == 0 || self.len == 0 || query.trim().is_empty() { return Ok(Vec::new()); }
		let searcher = self.reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { tracing::debug!(?errors, "query parsed leniently"); }
		let collector = TopDocs::with_limit(k).tweak_score(|segment: &SegmentReader| {
			let ordinals = segment.fast_fields().u64("ordinal").ok();
			move |doc: DocId, score: Score| {
				let ordinal = ordinals.as_ref().and_then(|col| col.first(doc)).unwrap_or(u64::MAX);
				(score, Reverse(ordinal))
			}
		});
		let top_docs: Vec<((Score, Reverse<u64>), DocAddress)> = searcher.search(&q, &collector)?;
		let mut ranked = Vec::with_capacity(top_docs.len());
		for ((score, _), addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.id_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
			ranked.push(SearchHit { id, score, source: SourceKind::Keyword });
		}
		Ok(ranked)
	}
}
