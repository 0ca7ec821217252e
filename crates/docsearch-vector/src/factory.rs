use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use docsearch_core::config::{VectorBackend, VectorConfig};
use docsearch_core::error::Error;
use docsearch_core::traits::{Embedder, VectorIndex, VectorStoreFactory};
use docsearch_core::types::Chunk;

use crate::flat::FlatVectorStore;
use crate::lance::LanceVectorStore;
use crate::manifest::{fingerprint, StoreManifest};

/// Opens the store persisted under a directory when it is still usable,
/// otherwise embeds the corpus and writes a new one.
pub struct PersistentVectorStoreFactory {
    config: VectorConfig,
    batch_size: usize,
}

pub fn build_vector_factory(config: &VectorConfig, batch_size: usize) -> Box<dyn VectorStoreFactory> {
    Box::new(PersistentVectorStoreFactory::new(config.clone(), batch_size))
}

enum Decision {
    Reuse(StoreManifest),
    Rebuild(&'static str),
}

impl PersistentVectorStoreFactory {
    pub fn new(config: VectorConfig, batch_size: usize) -> Self {
        Self { config, batch_size: batch_size.max(1) }
    }

    fn decide(&self, manifest: Option<StoreManifest>, fp: &str, embedder: &dyn Embedder) -> Decision {
        let Some(m) = manifest else { return Decision::Rebuild("no persisted store") };
        if m.count == 0 {
            return Decision::Rebuild("persisted store is empty");
        }
        if m.backend != self.config.backend {
            return Decision::Rebuild("persisted store uses another backend");
        }
        if m.dim != embedder.dim() {
            return Decision::Rebuild("persisted store has another dimension");
        }
        if m.embedder_id != embedder.id() {
            return Decision::Rebuild("persisted store was embedded by another model");
        }
        if m.fingerprint != fp {
            if self.config.rebuild_on_change {
                return Decision::Rebuild("sources changed since the store was built");
            }
            tracing::warn!(
                built_at = %m.created_at,
                "sources changed since the vector store was built; reusing it (set vector.rebuild_on_change to rebuild)"
            );
        }
        Decision::Reuse(m)
    }

    fn open(&self, dir: &Path, manifest: &StoreManifest) -> Result<Box<dyn VectorIndex>> {
        let store: Box<dyn VectorIndex> = match self.config.backend {
            VectorBackend::Flat => Box::new(FlatVectorStore::load(dir, self.config.metric)?),
            VectorBackend::Lance => Box::new(LanceVectorStore::open(dir, &self.config.table, self.config.metric, manifest.dim)?),
        };
        anyhow::ensure!(
            store.len() == manifest.count,
            "vector store at {} holds {} entries but its manifest records {}",
            dir.display(),
            store.len(),
            manifest.count
        );
        Ok(store)
    }

    fn embed_all(&self, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Vec<Vec<f32>>> {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = embedder
                .embed_batch(&texts)
                .map_err(|e| Error::Embedding(format!("{e:#}")))?;
            if embedded.len() != batch.len() {
                return Err(Error::Embedding(format!("embedder returned {} vectors for {} texts", embedded.len(), batch.len())).into());
            }
            if let Some(v) = embedded.iter().find(|v| v.len() != embedder.dim()) {
                return Err(Error::Embedding(format!("embedder {} declared dim {} but produced {}", embedder.id(), embedder.dim(), v.len())).into());
            }
            vectors.extend(embedded);
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");
        Ok(vectors)
    }

    fn write_store(&self, dir: &Path, chunks: &[Chunk], embedder: &dyn Embedder, fp: String) -> Result<Box<dyn VectorIndex>> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        // Manifest goes first so an interrupted rebuild leaves an absent store.
        StoreManifest::remove(dir)?;
        FlatVectorStore::remove(dir)?;

        tracing::info!(chunks = chunks.len(), embedder = embedder.id(), backend = ?self.config.backend, "Building vector store");
        let vectors = self.embed_all(chunks, embedder)?;
        let dim = embedder.dim();
        let store: Box<dyn VectorIndex> = match self.config.backend {
            VectorBackend::Flat => {
                let store = FlatVectorStore::new(chunks, vectors, self.config.metric, dim);
                store.save(dir)?;
                Box::new(store)
            }
            VectorBackend::Lance => Box::new(LanceVectorStore::create(dir, &self.config.table, chunks, &vectors, self.config.metric, dim)?),
        };
        StoreManifest::new(self.config.backend, self.config.metric, dim, chunks.len(), embedder.id(), fp).write(dir)?;
        tracing::info!(dir = %dir.display(), count = chunks.len(), "Vector store persisted");
        Ok(store)
    }
}

impl VectorStoreFactory for PersistentVectorStoreFactory {
    fn open_or_build(&self, dir: &Path, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Box<dyn VectorIndex>> {
        if chunks.is_empty() {
            return Ok(Box::new(FlatVectorStore::empty(self.config.metric, embedder.dim())));
        }
        let fp = fingerprint(chunks);
        match self.decide(StoreManifest::read(dir)?, &fp, embedder) {
            Decision::Reuse(manifest) => match self.open(dir, &manifest) {
                Ok(store) => {
                    tracing::info!(dir = %dir.display(), count = manifest.count, "Reusing persisted vector store");
                    Ok(store)
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "persisted vector store unreadable, rebuilding");
                    self.write_store(dir, chunks, embedder, fp)
                }
            },
            Decision::Rebuild(reason) => {
                tracing::debug!(reason, "rebuilding vector store");
                self.write_store(dir, chunks, embedder, fp)
            }
        }
    }

    fn build(&self, dir: &Path, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Box<dyn VectorIndex>> {
        if chunks.is_empty() {
            StoreManifest::remove(dir)?;
            return Ok(Box::new(FlatVectorStore::empty(self.config.metric, embedder.dim())));
        }
        self.write_store(dir, chunks, embedder, fingerprint(chunks))
    }
}
