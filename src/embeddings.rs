//! Embedding capability and the Cohere cloud implementation
//!
//! Documents and queries are embedded with different input types (Cohere
//! v3 models are asymmetric). All vectors are L2-normalized on receipt so
//! the index's Euclidean distance tracks cosine similarity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const COHERE_API_URL: &str = "https://api.cohere.com/v1/embed";
const COHERE_MODEL: &str = "embed-english-v3.0";

/// Text-in/vector-out embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed document chunks for indexing.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, String>;
}

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Cohere cloud embeddings (used when COHERE_API_KEY is configured).
pub struct CohereEmbedder {
    api_key: String,
    client: reqwest::Client,
}

impl CohereEmbedder {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn embed(&self, texts: &[String], input_type: &str) -> Result<Vec<Vec<f32>>, String> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbedRequest {
            model: COHERE_MODEL,
            texts,
            input_type,
        };

        let response = self
            .client
            .post(COHERE_API_URL)
            .bearer_auth(self.api_key.trim())
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Cohere API error {}: {}", status, body));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse embed response: {}", e))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(format!(
                "Cohere returned {} embeddings for {} texts",
                parsed.embeddings.len(),
                texts.len()
            ));
        }

        let mut embeddings = parsed.embeddings;
        for emb in &mut embeddings {
            l2_normalize(emb);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        self.embed(texts, "search_document").await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, String> {
        let mut embeddings = self.embed(&[text.to_string()], "search_query").await?;
        embeddings
            .pop()
            .ok_or_else(|| "Cohere returned no embedding for query".to_string())
    }
}

/// Deterministic embedder for tests: hashes character counts into a small
/// fixed-dimension vector so similar strings land near each other only
/// when explicitly constructed to.
#[cfg(test)]
pub struct StubEmbedder {
    pub dim: usize,
}

#[cfg(test)]
impl StubEmbedder {
    pub fn new() -> Self {
        Self { dim: 8 }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for (i, b) in text.bytes().enumerate() {
            v[i % self.dim] += (b as f32) / 255.0;
        }
        l2_normalize(&mut v);
        v
    }
}

#[cfg(test)]
#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, String> {
        Ok(self.vector_for(text))
    }
}
