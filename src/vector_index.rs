//! Similarity index over document chunks
//!
//! HNSW (instant-distance) map from chunk embeddings to chunk text,
//! providing O(log n) nearest-neighbor queries. Persisted per session with
//! bincode; rebuilds overwrite the previous artifact.

use instant_distance::{Builder, HnswMap, Point as HnswPoint, Search};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "index.bin";

/// Embedding point wrapper for HNSW.
/// Distance is Euclidean (smaller = closer); for normalized embeddings
/// this is monotonic in cosine similarity.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingPoint(pub Vec<f32>);

impl HnswPoint for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Searchable index of (chunk text, embedding) pairs.
#[derive(Serialize, Deserialize)]
pub struct VectorIndex {
    index: HnswMap<EmbeddingPoint, String>,
    chunk_count: usize,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

impl VectorIndex {
    /// Build an index from chunks and their embeddings.
    ///
    /// ef_construction=100 / ef_search=50 trade build speed for ~95%
    /// recall, plenty for a single paper's worth of chunks.
    pub fn build(chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self, String> {
        if chunks.len() != embeddings.len() {
            return Err(format!(
                "chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            ));
        }
        if chunks.is_empty() {
            return Err("cannot build an index over zero chunks".to_string());
        }

        let chunk_count = chunks.len();
        let points: Vec<EmbeddingPoint> = embeddings.into_iter().map(EmbeddingPoint).collect();
        let index = Builder::default()
            .ef_construction(100)
            .ef_search(50)
            .build(points, chunks);

        println!("[Index] Built HNSW index over {} chunks", chunk_count);
        Ok(Self { index, chunk_count })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Return the k chunks nearest to the query embedding, closest first,
    /// as (chunk text, cosine similarity) pairs.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let query_point = EmbeddingPoint(query.to_vec());
        let mut search = Search::default();

        self.index
            .search(&query_point, &mut search)
            .take(k)
            .map(|item| {
                // For normalized vectors: cos_sim ≈ 1 - dist²/2
                let sim = 1.0 - (item.distance * item.distance / 2.0);
                (item.value.clone(), sim.clamp(0.0, 1.0))
            })
            .collect()
    }

    fn index_file(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Persist under a session directory, replacing any previous index.
    pub fn save(&self, dir: &Path) -> Result<(), String> {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create index directory {:?}: {}", dir, e))?;

        let bytes =
            bincode::serialize(self).map_err(|e| format!("Failed to serialize index: {}", e))?;
        let path = Self::index_file(dir);
        std::fs::write(&path, &bytes)
            .map_err(|e| format!("Failed to write index to {:?}: {}", path, e))?;

        println!(
            "[Index] Saved {} chunks ({} bytes) to {:?}",
            self.chunk_count,
            bytes.len(),
            path
        );
        Ok(())
    }

    /// Load a previously persisted index.
    pub fn load(dir: &Path) -> Result<Self, String> {
        let path = Self::index_file(dir);
        let bytes = std::fs::read(&path)
            .map_err(|e| format!("Failed to read index from {:?}: {}", path, e))?;
        bincode::deserialize(&bytes).map_err(|e| format!("Failed to deserialize index: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, i: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[i] = 1.0;
        v
    }

    fn sample_index() -> VectorIndex {
        let chunks = vec![
            "chunk about transformers".to_string(),
            "chunk about optics".to_string(),
            "chunk about biology".to_string(),
        ];
        let embeddings = vec![axis(4, 0), axis(4, 1), axis(4, 2)];
        VectorIndex::build(chunks, embeddings).unwrap()
    }

    #[test]
    fn test_search_returns_nearest_first() {
        let index = sample_index();
        let results = index.search(&axis(4, 1), 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "chunk about optics");
        assert!((results[0].1 - 1.0).abs() < 1e-5);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let index = sample_index();
        let results = index.search(&axis(4, 0), 10);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_mismatched_inputs_rejected() {
        let err = VectorIndex::build(vec!["a".to_string()], vec![]).unwrap_err();
        assert!(err.contains("mismatch"));
        assert!(VectorIndex::build(vec![], vec![]).is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index();
        index.save(dir.path()).unwrap();

        let loaded = VectorIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.chunk_count(), 3);
        let results = loaded.search(&axis(4, 2), 1);
        assert_eq!(results[0].0, "chunk about biology");
    }

    #[test]
    fn test_save_overwrites_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();

        let replacement = VectorIndex::build(
            vec!["only chunk".to_string()],
            vec![axis(4, 3)],
        )
        .unwrap();
        replacement.save(dir.path()).unwrap();

        let loaded = VectorIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.chunk_count(), 1);
    }
}
