//! On-device XLM-RoBERTa family encoder (BGE-M3 and friends) through candle.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use docsearch_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const MAX_LEN: usize = 256;
const PAD_ID: u32 = 1;

pub struct LocalModelEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    id: String,
}

impl LocalModelEmbedder {
    /// Loads `tokenizer.json`, `config.json` and `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "Loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        let dim = config.hidden_size;
        let name = model_dir.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "local".into());
        tracing::info!(dim, "Embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, id: format!("local:{name}:d{dim}") })
    }
}

impl Embedder for LocalModelEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, PAD_ID, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if start.elapsed().as_millis() > 100 { tracing::debug!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(v)
    }
}

/// `APP_MODEL_DIR`, then `MODEL_DIR`, then the configured directory, then `models/bge-m3`.
pub fn resolve_model_dir(configured: &str) -> Result<PathBuf> {
    let candidates = [std::env::var("APP_MODEL_DIR").ok(), std::env::var("MODEL_DIR").ok(), Some(configured.to_string()).filter(|s| !s.is_empty()), Some("models/bge-m3".to_string())];
    candidates
        .into_iter()
        .flatten()
        .map(|d| docsearch_core::config::expand_path(d))
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Could not locate an embedding model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}
