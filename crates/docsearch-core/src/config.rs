//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RETRIEVAL__K=8`). Every setting has a
//! default, so an empty environment yields a working configuration.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Build from an explicit figment, e.g. `Toml::string` in tests.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        match env {
            "prod" | "production" => {
                let provider: EmbeddingProvider = self.get("embedding.provider")?;
                if provider == EmbeddingProvider::Hashing {
                    tracing::warn!("production environment is using the hashing embedder");
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub vector: VectorConfig,
    pub embedding: EmbeddingConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        if self.embedding.dim == 0 {
            return Err(Error::Config("embedding.dim must be positive".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub source_dir: String,
    pub vector_dir: String,
    /// Empty keeps the keyword index in memory.
    pub keyword_index_dir: String,
    pub extensions: Vec<String>,
    pub pdftotext: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            source_dir: "./data".into(),
            vector_dir: "./vector_db".into(),
            keyword_index_dir: String::new(),
            extensions: vec!["pdf".into(), "txt".into(), "md".into()],
            pdftotext: "pdftotext".into(),
        }
    }
}

impl DataSettings {
    pub fn keyword_index_path(&self, base: &Path) -> Option<PathBuf> {
        if self.keyword_index_dir.trim().is_empty() { None } else { Some(resolve_with_base(base, &self.keyword_index_dir)) }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    #[default]
    Fixed,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: ChunkStrategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { strategy: ChunkStrategy::Fixed, chunk_size: 600, chunk_overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default result count. Also the fixed depth of the keyword retriever.
    pub k: usize,
    /// Depth fetched from each sub-retriever before hybrid fusion.
    pub candidates: usize,
    pub keyword_weight: f32,
    pub vector_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: 5, candidates: 20, keyword_weight: 0.5, vector_weight: 0.5 }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::Config("retrieval.k must be positive".into()));
        }
        if self.candidates == 0 {
            return Err(Error::Config("retrieval.candidates must be positive".into()));
        }
        for (name, w) in [("keyword_weight", self.keyword_weight), ("vector_weight", self.vector_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::Config(format!("retrieval.{name} must be a non-negative number, got {w}")));
            }
        }
        if self.keyword_weight + self.vector_weight <= 0.0 {
            return Err(Error::Config("retrieval weights must not both be zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Flat,
    Lance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub backend: VectorBackend,
    pub metric: Metric,
    pub table: String,
    /// Rebuild a persisted store whose chunk fingerprint no longer matches.
    pub rebuild_on_change: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { backend: VectorBackend::Flat, metric: Metric::Cosine, table: "chunks".into(), rebuild_on_change: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Hashing,
    OpenAi,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dim: usize,
    pub endpoint: String,
    pub api_key_env: String,
    pub batch_size: usize,
    pub model_dir: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hashing,
            model: "text-embedding-3-small".into(),
            dim: 1024,
            endpoint: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            batch_size: 64,
            model_dir: String::new(),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tool_server() {
        let s = Settings::default();
        assert_eq!(s.chunking.chunk_size, 600);
        assert_eq!(s.chunking.chunk_overlap, 50);
        assert_eq!(s.retrieval.k, 5);
        assert_eq!(s.retrieval.keyword_weight, 0.5);
        assert_eq!(s.retrieval.vector_weight, 0.5);
        assert_eq!(s.embedding.model, "text-embedding-3-small");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn toml_overrides_nested_keys_and_keeps_defaults() {
        let cfg = Config::from_figment(Figment::from(Toml::string(
            r#"
            [chunking]
            chunk_size = 100
            strategy = "paragraph"

            [vector]
            metric = "dot"
            "#,
        )));
        let s = cfg.settings().unwrap();
        assert_eq!(s.chunking.chunk_size, 100);
        assert_eq!(s.chunking.chunk_overlap, 50);
        assert_eq!(s.chunking.strategy, ChunkStrategy::Paragraph);
        assert_eq!(s.vector.metric, Metric::Dot);
        assert_eq!(s.vector.backend, VectorBackend::Flat);
        assert_eq!(cfg.get::<usize>("retrieval.k").unwrap(), 5);
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let cfg = Config::from_figment(Figment::from(Toml::string("[chunking]\nchunk_size = 50\nchunk_overlap = 50\n")));
        assert!(matches!(cfg.settings(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut r = RetrievalConfig::default();
        r.keyword_weight = 0.0;
        r.vector_weight = 0.0;
        assert!(r.validate().is_err());
        r.vector_weight = f32::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn keyword_index_path_empty_means_in_memory() {
        let base = Path::new("/srv/docs");
        let mut data = DataSettings::default();
        assert_eq!(data.keyword_index_path(base), None);
        data.keyword_index_dir = "idx/bm25".into();
        assert_eq!(data.keyword_index_path(base), Some(PathBuf::from("/srv/docs/idx/bm25")));
    }
}
