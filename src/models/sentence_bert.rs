use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use serde::Deserialize;
use std::str::FromStr;
use tokenizers::{Encoding, Tokenizer, TruncationParams};

use crate::error::{PipelineError, Result};
use crate::loaders::{SafetensorsModelLoader, TokenizerLoader};

/// Pretrained Sentence-BERT checkpoints on the Hugging Face Hub.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SentenceBertVariant {
    /// `sentence-transformers/bert-base-nli-mean-tokens`, the original mean-pooled SBERT.
    #[default]
    BertBaseNliMeanTokens,
    /// `sentence-transformers/all-MiniLM-L6-v2`, small and fast.
    AllMiniLmL6V2,
    /// Any BERT-architecture repository with `tokenizer.json` and weights.
    Custom(String),
}

impl SentenceBertVariant {
    /// Hugging Face repository id for this checkpoint.
    pub fn repo_id(&self) -> &str {
        match self {
            SentenceBertVariant::BertBaseNliMeanTokens => {
                "sentence-transformers/bert-base-nli-mean-tokens"
            }
            SentenceBertVariant::AllMiniLmL6V2 => "sentence-transformers/all-MiniLM-L6-v2",
            SentenceBertVariant::Custom(repo) => repo,
        }
    }
}

impl std::fmt::Display for SentenceBertVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repo_id())
    }
}

impl FromStr for SentenceBertVariant {
    type Err = PipelineError;

    /// Accepts the short names `bert-base-nli-mean-tokens` and `all-MiniLM-L6-v2`,
    /// or a full `owner/name` repository id.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let short = s.strip_prefix("sentence-transformers/").unwrap_or(s);
        if short.eq_ignore_ascii_case("bert-base-nli-mean-tokens") {
            Ok(SentenceBertVariant::BertBaseNliMeanTokens)
        } else if short.eq_ignore_ascii_case("all-MiniLM-L6-v2") {
            Ok(SentenceBertVariant::AllMiniLmL6V2)
        } else if s.contains('/') {
            Ok(SentenceBertVariant::Custom(s.to_string()))
        } else {
            Err(PipelineError::InvalidInput(format!(
                "Unknown model '{s}'. Use bert-base-nli-mean-tokens, all-MiniLM-L6-v2 or an owner/name repo id."
            )))
        }
    }
}

/// What to do with inputs longer than the encoder's position limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TruncationPolicy {
    /// Keep the leading tokens and log a warning.
    #[default]
    Truncate,
    /// Fail the call with [`PipelineError::Encoding`].
    Reject,
}

/// Options for loading a [`SentenceBertModel`].
#[derive(Debug, Clone, Default)]
pub struct SentenceBertOptions {
    /// Which checkpoint to load.
    pub variant: SentenceBertVariant,
    /// Handling of oversized inputs.
    pub truncation: TruncationPolicy,
}

#[derive(Deserialize)]
struct PositionLimit {
    max_position_embeddings: usize,
}

/// Frozen BERT encoder with attention-masked mean pooling.
pub struct SentenceBertModel {
    model: BertModel,
    tokens: BatchTokenizer,
    device: Device,
}

impl SentenceBertModel {
    /// Downloads (or reuses from the local cache) and loads the checkpoint.
    pub fn new(options: SentenceBertOptions, device: Device) -> Result<Self> {
        let repo_id = options.variant.repo_id();

        let files = SafetensorsModelLoader::new(repo_id).load()?;
        let config_str = std::fs::read_to_string(&files.config).map_err(|e| {
            PipelineError::ModelUnavailable(format!(
                "Failed to read '{}': {e}",
                files.config.display()
            ))
        })?;
        let config: Config = serde_json::from_str(&config_str).map_err(|e| {
            PipelineError::ModelUnavailable(format!("Invalid BERT config for '{repo_id}': {e}"))
        })?;
        let limit: PositionLimit = serde_json::from_str(&config_str).map_err(|e| {
            PipelineError::ModelUnavailable(format!(
                "Missing max_position_embeddings for '{repo_id}': {e}"
            ))
        })?;

        let vb = if files.weights.extension().is_some_and(|e| e == "safetensors") {
            unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device) }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)
        }
        .map_err(|e| {
            PipelineError::ModelUnavailable(format!("Failed to map weights of '{repo_id}': {e}"))
        })?;

        let model = BertModel::load(vb, &config).map_err(|e| {
            PipelineError::ModelUnavailable(format!("Failed to build BERT from '{repo_id}': {e}"))
        })?;

        let tokenizer = TokenizerLoader::new(repo_id, "tokenizer.json").load()?;
        let tokens = BatchTokenizer::new(tokenizer, limit.max_position_embeddings, options.truncation)
            .map_err(|e| {
                PipelineError::ModelUnavailable(format!("Failed to configure tokenizer: {e}"))
            })?;

        tracing::info!(
            model = repo_id,
            max_len = limit.max_position_embeddings,
            "sentence encoder ready"
        );

        Ok(Self {
            model,
            tokens,
            device,
        })
    }

    /// Device holding the model weights.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Tokenizes, pads and encodes `texts` in one forward pass, returning one
    /// mean-pooled vector per text.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch = self.tokens.pad_batch(texts)?;
        let shape = (batch.rows, batch.seq_len);

        let input_ids = Tensor::from_vec(batch.token_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(batch.attention_mask, shape, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pool(&hidden, &attention_mask)?;

        Ok(pooled.to_vec2::<f32>()?)
    }
}

/// Row-major token ids and attention mask for a padded batch.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PaddedBatch {
    token_ids: Vec<u32>,
    attention_mask: Vec<u32>,
    rows: usize,
    seq_len: usize,
}

/// Tokenizer configured for the encoder's position limit.
struct BatchTokenizer {
    tokenizer: Tokenizer,
    max_len: usize,
    truncation: TruncationPolicy,
    pad_id: u32,
}

impl BatchTokenizer {
    fn new(mut tokenizer: Tokenizer, max_len: usize, truncation: TruncationPolicy) -> Result<Self> {
        let params = match truncation {
            TruncationPolicy::Truncate => Some(TruncationParams {
                max_length: max_len,
                ..Default::default()
            }),
            TruncationPolicy::Reject => None,
        };
        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .unwrap_or(0);
        tokenizer
            .with_padding(None)
            .with_truncation(params)
            .map_err(|e| PipelineError::Encoding(e.to_string()))?;

        Ok(Self {
            tokenizer,
            max_len,
            truncation,
            pad_id,
        })
    }

    fn encode(&self, text: &str) -> Result<Encoding> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            PipelineError::Encoding(format!(
                "Tokenization failed on '{}': {}",
                preview(text),
                e
            ))
        })?;

        match self.truncation {
            TruncationPolicy::Truncate if !encoding.get_overflowing().is_empty() => {
                tracing::warn!(
                    text = %preview(text),
                    max_len = self.max_len,
                    "input truncated to encoder limit"
                );
            }
            TruncationPolicy::Reject if encoding.len() > self.max_len => {
                return Err(PipelineError::Encoding(format!(
                    "Input '{}' has {} tokens, encoder accepts at most {}",
                    preview(text),
                    encoding.len(),
                    self.max_len
                )));
            }
            _ => {}
        }

        Ok(encoding)
    }

    /// Pads every sequence to the longest in the batch with the pad id and mask 0.
    fn pad_batch(&self, texts: &[&str]) -> Result<PaddedBatch> {
        let encodings = texts
            .iter()
            .map(|text| self.encode(text))
            .collect::<Result<Vec<_>>>()?;

        let seq_len = encodings.iter().map(|e| e.len()).max().unwrap_or(0);
        let mut token_ids: Vec<u32> = Vec::with_capacity(texts.len() * seq_len);
        let mut attention_mask: Vec<u32> = Vec::with_capacity(texts.len() * seq_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            token_ids.extend_from_slice(ids);
            token_ids.resize(token_ids.len() + seq_len - ids.len(), self.pad_id);

            let mask = encoding.get_attention_mask();
            attention_mask.extend_from_slice(mask);
            attention_mask.resize(attention_mask.len() + seq_len - mask.len(), 0);
        }

        Ok(PaddedBatch {
            token_ids,
            attention_mask,
            rows: encodings.len(),
            seq_len,
        })
    }
}

impl crate::pipelines::similarity::model::SentenceEmbeddingModel for SentenceBertModel {
    type Options = SentenceBertOptions;

    fn new(options: Self::Options, device: Device) -> Result<Self> {
        SentenceBertModel::new(options, device)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

/// Averages token vectors over the sequence dimension, ignoring padded positions.
///
/// `hidden` is `(batch, seq_len, dim)` and `attention_mask` is `(batch, seq_len)`
/// with 1 for real tokens and 0 for padding. Returns `(batch, dim)`.
pub fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?;
    summed.broadcast_div(&counts)
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
