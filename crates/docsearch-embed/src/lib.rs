//! Embedding providers behind [`docsearch_core::traits::Embedder`].
//!
//! * [`HashingEmbedder`] is deterministic and offline. Tests and
//!   `APP_USE_FAKE_EMBEDDINGS=1` use it.
//! * [`OpenAiEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint.
//! * `LocalModelEmbedder` runs an XLM-RoBERTa encoder through candle. It is
//!   only compiled with the `local-model` feature.

use anyhow::Result;

use docsearch_core::config::{EmbeddingConfig, EmbeddingProvider};
use docsearch_core::traits::Embedder;

pub mod hashing;
pub mod openai;

#[cfg(feature = "local-model")]
pub mod device;
#[cfg(feature = "local-model")]
pub mod local;
#[cfg(feature = "local-model")]
pub mod pool;
#[cfg(feature = "local-model")]
pub mod tokenize;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;

#[cfg(feature = "local-model")]
pub use local::LocalModelEmbedder;
#[cfg(feature = "local-model")]
pub use pool::masked_mean_l2;

fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").map(|v| v == "1").unwrap_or(false)
}

/// Build the embedder the configuration asks for.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    if fake_embeddings_forced() {
        tracing::info!(dim = config.dim, "APP_USE_FAKE_EMBEDDINGS=1, using hashing embedder");
        return Ok(Box::new(HashingEmbedder::new(config.dim)));
    }
    match config.provider {
        EmbeddingProvider::Hashing => Ok(Box::new(HashingEmbedder::new(config.dim))),
        EmbeddingProvider::OpenAi => Ok(Box::new(OpenAiEmbedder::from_config(config)?)),
        EmbeddingProvider::Local => build_local(config),
    }
}

#[cfg(feature = "local-model")]
fn build_local(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let dir = local::resolve_model_dir(&config.model_dir)?;
    let embedder = LocalModelEmbedder::load(&dir)?;
    if embedder.dim() != config.dim {
        tracing::warn!(configured = config.dim, actual = embedder.dim(), "embedding.dim differs from the model's hidden size; using the model's");
    }
    Ok(Box::new(embedder))
}

#[cfg(not(feature = "local-model"))]
fn build_local(_config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    Err(docsearch_core::Error::Config("embedding provider 'local' requires building with the `local-model` feature".into()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_provider_honours_configured_dim() {
        let config = EmbeddingConfig { provider: EmbeddingProvider::Hashing, dim: 32, ..EmbeddingConfig::default() };
        let e = build_embedder(&config).unwrap();
        assert_eq!(e.dim(), 32);
        assert_eq!(e.embed("abc").unwrap().len(), 32);
    }

    #[cfg(not(feature = "local-model"))]
    #[test]
    fn local_provider_without_feature_is_a_configuration_error() {
        if fake_embeddings_forced() { return; }
        let config = EmbeddingConfig { provider: EmbeddingProvider::Local, ..EmbeddingConfig::default() };
        let err = build_embedder(&config).err().expect("must fail");
        assert!(matches!(err.downcast_ref::<docsearch_core::Error>(), Some(docsearch_core::Error::Config(_))));
    }
}
