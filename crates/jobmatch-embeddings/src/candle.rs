//! Candle-based embedding implementation.
//!
//! Runs a sentence-transformers BERT model (all-MiniLM-L6-v2 by default)
//! on the CPU and mean-pools token states into 384-dimensional vectors.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache, MODEL_REVISION};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Embedding dimension for all-MiniLM-L6-v2
pub const EMBEDDING_DIM: usize = 384;

/// Maximum sequence length
pub const MAX_SEQ_LENGTH: usize = 256;

/// Default batch size for embedding
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Candle-based BERT embedder.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the embedding model from cache (downloading if needed).
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(cache)?;
        let mut embedder = Self::load_from_paths(&paths.config, &paths.tokenizer, &paths.weights)?;
        embedder.info.name = cache.model_name().to_string();
        embedder.info.version = paths.revision;
        Ok(embedder)
    }

    /// Load with default cache settings
    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    /// Load from explicit file paths
    pub fn load_from_paths(
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
    ) -> Result<Self, EmbeddingError> {
        info!("Loading embedding model...");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(config_path)?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::InvalidModelConfig {
                path: config_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let dimension = hidden_size(&config_str).unwrap_or(EMBEDDING_DIM);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the weights file is not modified while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DType::F32, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        info!(
            dim = dimension,
            max_seq = MAX_SEQ_LENGTH,
            "Model loaded successfully"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name: "all-MiniLM-L6-v2".to_string(),
                version: MODEL_REVISION.to_string(),
                dimension,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

    /// Tokenize and right-pad a batch into (input_ids, attention_mask) tensors.
    fn encode_padded(&self, texts: &[&str]) -> Result<(Tensor, Tensor), EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .clamp(1, MAX_SEQ_LENGTH);

        let mut ids_flat = Vec::with_capacity(texts.len() * seq_len);
        let mut mask_flat = Vec::with_capacity(texts.len() * seq_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let kept = ids.len().min(seq_len);

            ids_flat.extend_from_slice(&ids[..kept]);
            mask_flat.extend_from_slice(&mask[..kept]);
            ids_flat.extend(std::iter::repeat(0).take(seq_len - kept));
            mask_flat.extend(std::iter::repeat(0).take(seq_len - kept));
        }

        let input_ids = Tensor::from_vec(ids_flat, (texts.len(), seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask_flat, (texts.len(), seq_len), &self.device)?;
        Ok((input_ids, attention_mask))
    }

    /// Mean pooling over token embeddings (excluding padding)
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(embeddings.shape())?
            .to_dtype(DType::F32)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        // A fully padded row would divide by zero
        let count = mask.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum.broadcast_div(&count)?)
    }
}

/// Read `hidden_size` from a BERT config.json.
fn hidden_size(config_json: &str) -> Option<usize> {
    let value: serde_json::Value = serde_json::from_str(config_json).ok()?;
    value.get("hidden_size")?.as_u64().map(|n| n as usize)
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidInput("empty batch result".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(DEFAULT_BATCH_SIZE) {
            debug!(count = chunk.len(), "Embedding batch");

            let (input_ids, attention_mask) = self.encode_padded(chunk)?;
            let token_type_ids = input_ids.zeros_like()?;

            let output = self
                .model
                .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
            let pooled: Vec<Vec<f32>> = self.mean_pooling(&output, &attention_mask)?.to_vec2()?;

            embeddings.extend(pooled.into_iter().map(Embedding::new));
        }

        debug!(
            count = embeddings.len(),
            dim = self.info.dimension,
            "Batch complete"
        );

        Ok(embeddings)
    }
}
