//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use adk_retrieval::{
    DistanceStrategy, EmbeddingProvider, InMemoryVectorStore, Metadata, RetrievalError,
    SimilaritySearch,
};
use async_trait::async_trait;

/// Embeddings looked up from a fixed table; unknown texts get a hashed vector.
pub struct FixedEmbeddings {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FixedEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimensions);
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed(&self, text: &str) -> Vec<f32> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        (0..self.dimensions).map(|i| ((hash.wrapping_add(i as u64)) as f32).sin()).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbeddings {
    async fn embed_query(&self, text: &str) -> adk_retrieval::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(text) {
            return Err(RetrievalError::Embedding {
                provider: "fixed".into(),
                message: format!("refusing to embed '{text}'"),
            });
        }
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.hashed(text)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A 2-d unit vector whose cosine similarity with `[1, 0]` is `cos`.
pub fn unit(cos: f32) -> Vec<f32> {
    vec![cos, (1.0 - cos * cos).sqrt()]
}

pub fn metadata(value: serde_json::Value) -> Metadata {
    serde_json::from_value(value).expect("metadata must be a JSON object")
}

pub fn search_with(
    embeddings: Arc<FixedEmbeddings>,
    strategy: DistanceStrategy,
) -> Arc<SimilaritySearch> {
    let dimensions = embeddings.dimensions();
    Arc::new(
        SimilaritySearch::builder()
            .embedding_provider(embeddings)
            .vector_store(Arc::new(InMemoryVectorStore::new(dimensions)))
            .distance_strategy(strategy)
            .build()
            .expect("search builds"),
    )
}
