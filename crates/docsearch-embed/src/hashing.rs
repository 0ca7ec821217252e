use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use docsearch_core::traits::Embedder;

/// Deterministic bag-of-words embedding: every lower-cased token is hashed into
/// one of `dim` buckets and the counts are L2-normalized. Needs no model and no
/// network, so tests and offline runs use it.
pub struct HashingEmbedder {
    dim: usize,
    id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), id: format!("hashing:d{}", dim.max(1)) }
    }
}

impl Embedder for HashingEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            v[(h as usize) % self.dim] += 1.0;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}
