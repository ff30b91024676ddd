//! Sentence embeddings from a local BERT-family checkpoint (e.g. GIST-large,
//! bge-large), loaded with candle from a directory holding `config.json`,
//! `tokenizer.json` and `model.safetensors` or `pytorch_model.bin`.

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docqa_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;

const DEFAULT_MAX_LEN: usize = 512;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer = load_tokenizer(model_dir)?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let shape: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = shape["hidden_size"].as_u64().ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let max_positions = shape["max_position_embeddings"].as_u64().map_or(DEFAULT_MAX_LEN, |v| v as usize);
        let max_len = tokenizer_max_len(model_dir).unwrap_or(DEFAULT_MAX_LEN).min(max_positions);

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!(dim, max_len, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = self.tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(self.max_len);
        mask.truncate(self.max_len);

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(mask.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        debug!(tokens = ids.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(v)
    }
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

pub(crate) fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))
}

fn tokenizer_max_len(model_dir: &Path) -> Option<usize> {
    let raw = std::fs::read_to_string(model_dir.join("tokenizer_config.json")).ok()?;
    let v: serde_json::Value = serde_json::from_str(&raw).ok()?;
    v["model_max_length"].as_u64().map(|n| n as usize)
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        return Ok(candle_core::pickle::read_all(&pickle)?.into_iter().collect());
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}
