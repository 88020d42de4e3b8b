//! Deterministic offline embedding provider.
//!
//! Hashes lowercase word tokens into a fixed number of buckets and
//! L2-normalises the result, so texts sharing words score higher under inner
//! product. No semantic understanding; meant for tests and local smoke runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::EmbeddingVector;
use crate::domain::ports::EmbeddingProvider;

#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
    model: String,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model: format!("hashing-{dimension}"),
        }
    }

    pub fn vectorize(&self, text: &str) -> EmbeddingVector {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in tokens(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = usize::try_from(hasher.finish() % self.dimension as u64).unwrap_or(0);
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// Lowercase alphanumeric words with a trailing plural `s` stripped.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let w = w.to_lowercase();
            match w.strip_suffix('s') {
                Some(stem) if stem.len() > 2 => stem.to_string(),
                _ => w,
            }
        })
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    fn name(&self) -> &'static str {
        "hashing"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_texts(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}
