use std::path::Path;

use crate::types::{Chunk, Document, SearchHit};

/// The one capability the core needs from an embedding service.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hashing:d1024`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Turns a source file into a [`Document`].
pub trait DocumentLoader: Send + Sync {
    fn supports(&self, path: &Path) -> bool;
    fn load(&self, path: &Path) -> anyhow::Result<Document>;
}

/// Splits text into chunks.
pub trait TextSplitter: Send + Sync {
    /// Chunks paired with the number of leading characters each one repeats
    /// from the end of the chunk before it.
    fn split_with_overlaps(&self, text: &str) -> Vec<(String, usize)>;

    fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with_overlaps(text).into_iter().map(|(content, _)| content).collect()
    }

    /// Split every page of every document, assigning corpus-wide ordinals in
    /// load order.
    fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in docs {
            let mut chunk_index = 0;
            for page in &doc.pages {
                for (content, overlap) in self.split_with_overlaps(&page.text) {
                    chunks.push(Chunk {
                        id: format!("{}:{}", doc.id, chunk_index),
                        ordinal: chunks.len(),
                        source: doc.id.clone(),
                        title: doc.title.clone(),
                        page: page.number,
                        overlap,
                        content,
                        chunk_index,
                    });
                    chunk_index += 1;
                }
            }
        }
        chunks
    }
}

pub trait KeywordIndex: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>>;
}

pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn search_vec(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// Opens a persisted vector store or builds (and persists) a fresh one.
pub trait VectorStoreFactory: Send + Sync {
    fn open_or_build(
        &self,
        dir: &Path,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
    ) -> anyhow::Result<Box<dyn VectorIndex>>;

    /// Embed and persist `chunks` even if a usable store already exists.
    fn build(&self, dir: &Path, chunks: &[Chunk], embedder: &dyn Embedder) -> anyhow::Result<Box<dyn VectorIndex>>;
}
