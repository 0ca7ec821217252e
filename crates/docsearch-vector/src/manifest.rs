//! `index.json`: the marker that makes a vector store directory loadable.
//!
//! The manifest is written after the backend data, so a directory without one
//! (or with `count == 0`) is an interrupted or empty build and gets rebuilt.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use docsearch_core::config::{Metric, VectorBackend};
use docsearch_core::types::Chunk;

pub const MANIFEST_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub backend: VectorBackend,
    pub metric: Metric,
    pub dim: usize,
    pub count: usize,
    pub embedder_id: String,
    /// blake3 over every chunk id and content, in ordinal order.
    pub fingerprint: String,
    pub created_at: String,
}

impl StoreManifest {
    pub fn new(backend: VectorBackend, metric: Metric, dim: usize, count: usize, embedder_id: &str, fingerprint: String) -> Self {
        Self {
            backend,
            metric,
            dim,
            count,
            embedder_id: embedder_id.to_string(),
            fingerprint,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// `Ok(None)` when there is no manifest or it cannot be parsed.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        match serde_json::from_str(&raw) {
            Ok(m) => Ok(Some(m)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable vector store manifest, treating store as absent");
                Ok(None)
            }
        }
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("renaming to {}", path.display()))?;
        Ok(())
    }

    pub fn remove(dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for chunk in chunks {
        hasher.update(chunk.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(chunk.content.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}
