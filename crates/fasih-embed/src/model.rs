use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use fasih_core::config::EmbeddingSettings;
use fasih_core::error::Error;
use fasih_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const DEFAULT_MODEL_DIRS: [&str; 2] = ["models/multilingual-e5-base", "../models/multilingual-e5-base"];

/// Multilingual E5 (XLM-RoBERTa encoder) with mean pooling, run through candle.
pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
    batch_size: usize,
}

impl EmbeddingModel {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        Self::from_dir(&model_dir, settings)
    }

    /// Load the encoder from `model_dir`, taking length, batch and device from `settings`.
    pub fn from_dir(model_dir: &Path, settings: &EmbeddingSettings) -> Result<Self> {
        let device = select_device(settings.device)?;
        tracing::info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::Embedding(format!("{} has no hidden_size", config_path.display())))?
            as usize;

        let weights = load_weights(model_dir, &device)?;
        let nested = weights.keys().any(|k| k.starts_with("roberta."));
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let vb = if nested { vb.pp("roberta") } else { vb };
        let model = XLMRobertaModel::new(&config, vb)?;

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "e5".to_string());
        tracing::info!(model = %name, dim, "embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            id: format!("e5:{name}"),
            dim,
            max_len: settings.max_len,
            batch_size: settings.batch_size.max(1),
        })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        Ok(vectors)
    }
}

impl Embedder for EmbeddingModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk)?);
        }
        tracing::debug!(texts = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device)
            .with_context(|| format!("loading {}", safetensors.display()));
    }
    let pickle = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&pickle)
        .with_context(|| format!("loading {}", pickle.display()))?;
    weights
        .into_iter()
        .map(|(name, tensor)| tensor.to_device(device).map(|t| (name, t)).map_err(anyhow::Error::from))
        .collect()
}

/// Model directory from settings, then `APP_MODEL_DIR`, `MODEL_DIR`, then the
/// conventional `models/` locations.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(fasih_core::config::expand_path)
        .into_iter()
        .chain(["APP_MODEL_DIR", "MODEL_DIR"].iter().filter_map(|var| std::env::var(var).ok().map(PathBuf::from)))
        .chain(DEFAULT_MODEL_DIRS.iter().map(PathBuf::from));
    for dir in candidates {
        if dir.exists() {
            tracing::debug!(dir = %dir.display(), "using model dir");
            return Ok(dir);
        }
    }
    Err(Error::Embedding("could not locate the E5 model directory; set embedding.model_dir or APP_MODEL_DIR".to_string()).into())
}
