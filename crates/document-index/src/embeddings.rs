use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingsStatus {
    Success,
    Error,
    RateLimited,
}

/// Result of one embeddings call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    pub status: EmbeddingsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EmbeddingsResponse {
    pub const fn success(output: Vec<Vec<f32>>) -> Self {
        Self {
            status: EmbeddingsStatus::Success,
            output: Some(output),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: EmbeddingsStatus::Error,
            output: None,
            message: Some(message.into()),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            status: EmbeddingsStatus::RateLimited,
            output: None,
            message: Some(message.into()),
        }
    }
}

/// External embeddings capability.
///
/// Implementations must return one vector per input, in input order.
#[async_trait]
pub trait EmbeddingsModel: Send + Sync {
    /// Upper bound on the summed token count of one `create_embeddings` call
    fn max_tokens(&self) -> usize;

    async fn create_embeddings(&self, inputs: &[String]) -> EmbeddingsResponse;
}

/// Deterministic offline embeddings.
///
/// Each input hashes to a fixed pseudo-random unit vector. Equal texts embed identically,
/// different texts are close to orthogonal. Useful for tests and for wiring a pipeline
/// before a real model is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbeddings {
    dimension: usize,
    max_tokens: usize,
}

impl HashEmbeddings {
    pub const DEFAULT_DIMENSION: usize = 64;
    pub const DEFAULT_MAX_TOKENS: usize = 8000;

    pub const fn new(dimension: usize, max_tokens: usize) -> Self {
        Self {
            dimension,
            max_tokens,
        }
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        hash_embed(text, self.dimension)
    }
}

impl Default for HashEmbeddings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION, Self::DEFAULT_MAX_TOKENS)
    }
}

#[async_trait]
impl EmbeddingsModel for HashEmbeddings {
    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    async fn create_embeddings(&self, inputs: &[String]) -> EmbeddingsResponse {
        if self.dimension == 0 {
            return EmbeddingsResponse::error("dimension must be >= 1");
        }
        EmbeddingsResponse::success(inputs.iter().map(|text| self.embed(text)).collect())
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vector = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let mantissa = ((bits >> 32) as u32) >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vector.push(unit.mul_add(2.0, -1.0));
    }
    let norm = vectra_vector_store::normalize(&vector);
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vectra_vector_store::{cosine_similarity, normalize};

    #[tokio::test]
    async fn embeddings_are_deterministic_unit_vectors() {
        let model = HashEmbeddings::new(32, 100);
        let inputs = vec!["alpha".to_string(), "beta".to_string(), "alpha".to_string()];
        let response = model.create_embeddings(&inputs).await;
        assert_eq!(response.status, EmbeddingsStatus::Success);

        let output = response.output.unwrap();
        assert_eq!(output.len(), 3);
        assert_eq!(output[0], output[2]);
        assert_ne!(output[0], output[1]);
        assert!((normalize(&output[1]) - 1.0).abs() < 1e-5);
        assert_eq!(output[0].len(), 32);
    }

    #[test]
    fn identical_text_has_similarity_one() {
        let model = HashEmbeddings::default();
        let a = model.embed("the quick brown fox");
        let b = model.embed("the quick brown fox");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn zero_dimension_reports_error() {
        let model = HashEmbeddings::new(0, 10);
        let response = model.create_embeddings(&["x".to_string()]).await;
        assert_eq!(response.status, EmbeddingsStatus::Error);
        assert!(response.message.is_some());
    }
}
