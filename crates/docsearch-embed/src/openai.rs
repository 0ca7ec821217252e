//! OpenAI-compatible `/embeddings` client.
//!
//! Works with OpenAI's API and any endpoint that speaks the same request and
//! response shape (vLLM, LiteLLM, Ollama's `/v1` shim).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docsearch_core::config::EmbeddingConfig;
use docsearch_core::error::Error;
use docsearch_core::traits::Embedder;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dim: usize,
    id: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String, endpoint: String, dim: usize) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building HTTP client")?;
        let id = format!("openai:{model}:d{dim}");
        Ok(Self { client, endpoint: endpoint.trim_end_matches('/').to_string(), api_key, model, dim, id })
    }

    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!("embedding provider 'openai' needs an API key in ${}", config.api_key_env))
        })?;
        Self::new(api_key, config.model.clone(), config.endpoint.clone(), config.dim)
    }

    /// text-embedding-3 models accept a target dimensionality; older ones do not.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model.starts_with("text-embedding-3").then_some(self.dim)
    }
}

impl Embedder for OpenAiEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("empty response from embedding endpoint"))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let url = format!("{}/embeddings", self.endpoint);
        let request = EmbeddingRequest { model: &self.model, input: texts, dimensions: self.requested_dimensions() };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .with_context(|| format!("POST {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Embedding(format!("embedding API error {status}: {body}")).into());
        }

        let mut result: EmbeddingResponse = response.json().context("decoding embedding response")?;
        if result.data.len() != texts.len() {
            return Err(anyhow!("embedding API returned {} vectors for {} inputs", result.data.len(), texts.len()));
        }
        result.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = result.data.into_iter().map(|d| d.embedding).collect();
        if let Some(v) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::Config(format!("embedding.dim is {} but the model returned {}", self.dim, v.len())).into());
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_dimensions_only_for_v3_models() {
        let inputs = vec!["hello".to_string()];
        let v3 = OpenAiEmbedder::new("k".into(), "text-embedding-3-small".into(), "http://localhost/v1/".into(), 512).unwrap();
        let body = serde_json::to_value(EmbeddingRequest { model: &v3.model, input: &inputs, dimensions: v3.requested_dimensions() }).unwrap();
        assert_eq!(body["dimensions"], 512);
        assert_eq!(v3.endpoint, "http://localhost/v1");

        let ada = OpenAiEmbedder::new("k".into(), "text-embedding-ada-002".into(), "http://localhost/v1".into(), 1536).unwrap();
        let body = serde_json::to_value(EmbeddingRequest { model: &ada.model, input: &inputs, dimensions: ada.requested_dimensions() }).unwrap();
        assert!(body.get("dimensions").is_none());
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let config = EmbeddingConfig { api_key_env: "DOCSEARCH_TEST_KEY_THAT_IS_NEVER_SET".into(), ..EmbeddingConfig::default() };
        let err = OpenAiEmbedder::from_config(&config).err().expect("must fail");
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Config(_))));
    }
}
