use crate::embeddings::cosine_similarity;
use crate::error::{Result, VectorStoreError};

/// Brute-force cosine index over record vectors.
///
/// Eligibility is decided per record during the scan, before ranking, so a
/// filtered top-K equals the unfiltered ranking with non-matching records
/// removed and then truncated. Ties keep insertion order (stable sort),
/// which keeps results deterministic for identical inputs.
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Append a vector; its index position is the record id.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    /// Rank eligible records by descending cosine similarity to `query`.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        eligible: impl Fn(usize) -> bool,
    ) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scores: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(id, _)| eligible(*id))
            .map(|(id, vector)| (id, cosine_similarity(query, vector)))
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(top_k);

        Ok(scores)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
