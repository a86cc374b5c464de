//! Local embedding generation using all-MiniLM-L6-v2 via candle.
//!
//! CPU-only fallback used when no Cohere key is configured. Produces
//! 384-dimensional mean-pooled, L2-normalized embeddings.

use crate::embeddings::Embedder;
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, HiddenAct, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const EMBEDDING_DIM: usize = 384;
const BATCH_SIZE: usize = 8;

/// Local sentence-transformer wrapper.
pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl LocalEmbedder {
    /// Download (if needed) and load the model from the Hugging Face Hub.
    pub fn new(model_id: Option<&str>) -> Result<Self, String> {
        let model_id = model_id.unwrap_or(DEFAULT_MODEL_ID);
        let device = Device::Cpu;

        let api = Api::new().map_err(|e| format!("Failed to create HF API: {}", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| format!("Failed to download config: {}", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| format!("Failed to download tokenizer: {}", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| format!("Failed to download weights: {}", e))?;

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config: {}", e))?;
        let mut config: Config = serde_json::from_str(&config_str)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        // MiniLM uses gelu activation
        config.hidden_act = HiddenAct::Gelu;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| format!("Failed to load tokenizer: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: 512,
                ..Default::default()
            }))
            .map_err(|e| format!("Failed to set truncation: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| format!("Failed to load weights: {}", e))?
        };
        let model =
            BertModel::load(vb, &config).map_err(|e| format!("Failed to build model: {}", e))?;

        println!("[LocalEmbeddings] Model loaded: {}", model_id);

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Encode a batch of texts into normalized embeddings.
    pub fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, String> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            results.extend(self.encode_batch(batch)?);
        }
        Ok(results)
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, String> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let err = |stage: &str| {
            let stage = stage.to_string();
            move |e: candle_core::Error| format!("{} failed: {}", stage, e)
        };

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| format!("Tokenization failed: {}", e))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut all_ids = Vec::with_capacity(batch_size * seq_len);
        let mut all_mask = Vec::with_capacity(batch_size * seq_len);
        let mut all_type_ids = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            all_ids.extend(encoding.get_ids().iter().map(|&x| x as i64));
            all_mask.extend(encoding.get_attention_mask().iter().map(|&x| x as i64));
            all_type_ids.extend(encoding.get_type_ids().iter().map(|&x| x as i64));
        }

        let shape = (batch_size, seq_len);
        let input_ids = Tensor::from_vec(all_ids, shape, &self.device).map_err(err("input_ids"))?;
        let attention_mask =
            Tensor::from_vec(all_mask, shape, &self.device).map_err(err("attention_mask"))?;
        let token_type_ids =
            Tensor::from_vec(all_type_ids, shape, &self.device).map_err(err("token_type_ids"))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(err("forward pass"))?;

        // Mean pooling over non-padding positions
        let mask = attention_mask
            .unsqueeze(2)
            .and_then(|m| m.to_dtype(DTYPE))
            .and_then(|m| m.broadcast_as(hidden_states.shape()))
            .map_err(err("mask expansion"))?;
        let pooled = hidden_states
            .mul(&mask)
            .and_then(|h| h.sum(1))
            .map_err(err("masked sum"))?
            .div(
                &mask
                    .sum(1)
                    .and_then(|m| m.clamp(1e-9, f64::MAX))
                    .map_err(err("mask sum"))?,
            )
            .map_err(err("mean pooling"))?;

        // L2 normalize
        let norm = pooled
            .sqr()
            .and_then(|p| p.sum_keepdim(1))
            .and_then(|p| p.sqrt())
            .and_then(|p| p.clamp(1e-12, f64::MAX))
            .map_err(err("norm"))?;
        let normalized = pooled.broadcast_div(&norm).map_err(err("normalize"))?;

        let rows: Vec<Vec<f32>> = normalized.to_vec2().map_err(err("to_vec"))?;
        debug_assert!(rows.iter().all(|r| r.len() == EMBEDDING_DIM));
        Ok(rows)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        // Inference is CPU-bound; keep it off the async reactor threads.
        tokio::task::block_in_place(|| self.encode(&refs))
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, String> {
        let mut embeddings = tokio::task::block_in_place(|| self.encode(&[text]))?;
        embeddings
            .pop()
            .ok_or_else(|| "No embedding produced for query".to_string())
    }
}
