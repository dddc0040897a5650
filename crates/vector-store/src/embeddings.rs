use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::env;
use std::sync::Arc;

/// Black-box text → fixed-length vector function.
///
/// Implementations must be deterministic for identical input; search results
/// are otherwise not reproducible.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

const DEFAULT_DIMENSION: usize = 384;

/// Deterministic token-hashing embedder.
///
/// Each lowercase alphanumeric token contributes a SHA-256-derived pattern to
/// the output vector, which is then L2-normalized. Identical text always
/// embeds identically; texts sharing tokens land near each other. Suitable
/// for tests and offline runs; a model-backed embedder plugs in behind the
/// same trait.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            for (slot, byte) in vector.iter_mut().zip(digest.iter().cycle()) {
                *slot += f32::from(*byte) / 127.5 - 1.0;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for slot in &mut vector {
                *slot /= norm;
            }
        }
        Ok(vector)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Build the embedder selected by `TARIFF_EMBEDDING_MODE`.
///
/// Only the deterministic `stub` mode is built in; the variable exists so a
/// model-backed mode can be added without an interface change.
pub fn embedder_from_env() -> Result<Arc<dyn Embedder>> {
    let raw = env::var("TARIFF_EMBEDDING_MODE")
        .unwrap_or_else(|_| "stub".to_string())
        .to_ascii_lowercase();
    match raw.as_str() {
        "stub" => Ok(Arc::new(HashEmbedder::default())),
        other => Err(VectorStoreError::EmbeddingError(format!(
            "Unsupported TARIFF_EMBEDDING_MODE '{other}' (expected 'stub')"
        ))),
    }
}
