use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use docsearch_core::config::Metric;
use docsearch_core::traits::VectorIndex;
use docsearch_core::types::{Chunk, SearchHit};

use crate::similarity::{top_k, Candidate};

pub const VECTORS_FILE: &str = "vectors.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FlatEntry {
    id: String,
    ordinal: usize,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FlatFile {
    dim: usize,
    entries: Vec<FlatEntry>,
}

/// Brute-force store: every query scans all vectors.
#[derive(Debug)]
pub struct FlatVectorStore {
    metric: Metric,
    dim: usize,
    entries: Vec<FlatEntry>,
}

impl FlatVectorStore {
    pub fn new(chunks: &[Chunk], vectors: Vec<Vec<f32>>, metric: Metric, dim: usize) -> Self {
        let entries = chunks
            .iter()
            .zip(vectors)
            .map(|(c, vector)| FlatEntry { id: c.id.clone(), ordinal: c.ordinal, vector })
            .collect();
        Self { metric, dim, entries }
    }

    pub fn empty(metric: Metric, dim: usize) -> Self {
        Self { metric, dim, entries: Vec::new() }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(VECTORS_FILE);
        let file = FlatFile { dim: self.dim, entries: self.entries.clone() };
        std::fs::write(&path, serde_json::to_vec(&file)?).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load(dir: &Path, metric: Metric) -> Result<Self> {
        let path = dir.join(VECTORS_FILE);
        let raw = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let file: FlatFile = serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self { metric, dim: file.dim, entries: file.entries })
    }

    pub fn remove(dir: &Path) -> Result<()> {
        let path = dir.join(VECTORS_FILE);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

impl VectorIndex for FlatVectorStore {
    fn len(&self) -> usize { self.entries.len() }

    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        anyhow::ensure!(
            query_vec.len() == self.dim || self.entries.is_empty(),
            "query vector has dimension {} but the store holds {}",
            query_vec.len(),
            self.dim
        );
        let candidates = self.entries.iter().map(|e| Candidate { id: &e.id, ordinal: e.ordinal, vector: &e.vector });
        Ok(top_k(self.metric, query_vec, candidates, k))
    }
}
