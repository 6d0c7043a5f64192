use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use coldata_core::config::{expand_path, ModelConfig};
use coldata_core::traits::Embedder;
use coldata_core::Error;
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pool::masked_mean;
use crate::tokenize::tokenize_batch;

enum Backbone {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

impl Backbone {
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> anyhow::Result<Tensor> {
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = match self {
            Backbone::Bert(m) => m.forward(input_ids, &token_type_ids, Some(attention_mask))?,
            Backbone::XlmRoberta(m) => m.forward(input_ids, attention_mask, &token_type_ids, None, None, None)?,
        };
        Ok(hidden)
    }
}

/// Files a sentence-embedding model is loaded from.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Transformer encoder plus mean pooling, loaded through candle.
pub struct CandleEmbedder {
    model_id: String,
    model: Backbone,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    normalize: bool,
}

impl CandleEmbedder {
    pub fn load(config: &ModelConfig) -> coldata_core::Result<Self> {
        let files = resolve_model_files(config).map_err(|e| Error::ModelUnavailable(format!("{}: {e:#}", config.model_name)))?;
        Self::from_files(config, &files).map_err(|e| Error::ModelUnavailable(format!("{}: {e:#}", config.model_name)))
    }

    fn from_files(config: &ModelConfig, files: &ModelFiles) -> anyhow::Result<Self> {
        let device = select_device(&config.device);
        tracing::info!(model = %config.model_name, weights = %files.weights.display(), "loading embedding model");

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", files.tokenizer.display(), e))?;
        let raw = std::fs::read_to_string(&files.config)
            .with_context(|| format!("reading {}", files.config.display()))?;
        let meta: serde_json::Value = serde_json::from_str(&raw)?;
        let dim = meta["hidden_size"]
            .as_u64()
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let position_limit = meta["max_position_embeddings"].as_u64().map_or(usize::MAX, |n| n as usize);

        let vb = if files.weights.extension().is_some_and(|ext| ext == "safetensors") {
            // SAFETY: the weights file is not modified while mapped
            unsafe { VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)?
        };

        let model = match meta["model_type"].as_str() {
            Some("xlm-roberta") => {
                let cfg: XLMRobertaConfig = serde_json::from_str(&raw)?;
                Backbone::XlmRoberta(XLMRobertaModel::new(&cfg, vb)?)
            }
            _ => {
                let cfg: BertConfig = serde_json::from_str(&raw)?;
                Backbone::Bert(BertModel::load(vb, &cfg)?)
            }
        };
        tracing::info!(dim, "embedding model loaded");

        Ok(Self {
            model_id: config.model_name.clone(),
            model,
            tokenizer,
            device,
            dim,
            max_len: config.max_length.min(position_limit),
            normalize: config.normalize_embeddings,
        })
    }

    fn embed_inner(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let batch = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let hidden = self.model.forward(&batch.input_ids, &batch.attention_mask)?;
        let pooled = masked_mean(&hidden, &batch.attention_mask, self.normalize)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(rows)
    }
}

impl Embedder for CandleEmbedder {
    fn embedder_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn normalized(&self) -> bool { self.normalize }

    fn embed_batch(&self, texts: &[String]) -> coldata_core::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.embed_inner(texts).map_err(|e| Error::Embedding(format!("{e:#}")))?;
        if rows.len() != texts.len() {
            return Err(Error::Embedding(format!("{} vectors for {} texts", rows.len(), texts.len())));
        }
        Ok(rows)
    }
}

/// Local model directory, if one is configured.
///
/// `APP_MODEL_DIR` wins over `model_name`; `model_name` counts as local when
/// it names an existing directory.
pub fn resolve_model_dir(config: &ModelConfig) -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = expand_path(&dir);
        if p.is_dir() {
            return Some(p);
        }
        tracing::warn!(dir = %p.display(), "APP_MODEL_DIR is not a directory, ignoring");
    }
    let p = expand_path(&config.model_name);
    p.is_dir().then_some(p)
}

pub fn resolve_model_files(config: &ModelConfig) -> anyhow::Result<ModelFiles> {
    if let Some(dir) = resolve_model_dir(config) {
        tracing::info!(dir = %dir.display(), "using local model directory");
        return local_files(&dir);
    }

    let cache = expand_path(&config.snapshot_folder);
    let api = ApiBuilder::new().with_cache_dir(cache).with_progress(false).build()?;
    let repo = api.repo(Repo::with_revision(config.model_name.clone(), RepoType::Model, config.revision.clone()));
    let weights = repo
        .get("model.safetensors")
        .or_else(|_| repo.get("pytorch_model.bin"))
        .context("fetching model weights")?;
    Ok(ModelFiles {
        config: repo.get("config.json").context("fetching config.json")?,
        tokenizer: repo.get("tokenizer.json").context("fetching tokenizer.json")?,
        weights,
    })
}

fn local_files(dir: &Path) -> anyhow::Result<ModelFiles> {
    let weights = ["model.safetensors", "pytorch_model.bin"]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("no model.safetensors or pytorch_model.bin in {}", dir.display()))?;
    let files = ModelFiles { config: dir.join("config.json"), tokenizer: dir.join("tokenizer.json"), weights };
    for p in [&files.config, &files.tokenizer] {
        if !p.exists() {
            return Err(anyhow!("missing {}", p.display()));
        }
    }
    Ok(files)
}
