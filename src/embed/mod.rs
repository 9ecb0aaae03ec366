//! Text embeddings: the shared vector space for indexing and retrieval.

pub mod hashing;
#[cfg(feature = "minilm")]
pub mod minilm;

pub use hashing::HashEmbedder;
#[cfg(feature = "minilm")]
pub use minilm::MiniLmEmbedder;

use tracing::info;

use crate::config::{ConfigError, EmbedderKind};

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding model initialization failed: {0}")]
    ModelInit(String),

    #[error("embedding generation failed: {0}")]
    Generation(String),

    #[error("embedder returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("Async task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Deterministic text -> fixed-dimension vector function.
///
/// Indexing and retrieval must use the same `model_id`; vectors from different
/// models are not comparable.
pub trait Embedder {
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let vectors = self.embed_batch(&[text.to_string()]).await?;
        let [vector]: [Vec<f32>; 1] =
            vectors
                .try_into()
                .map_err(|v: Vec<Vec<f32>>| EmbedError::CountMismatch {
                    expected: 1,
                    got: v.len(),
                })?;
        Ok(vector)
    }
}

/// Embedder chosen at startup from configuration.
pub enum ConfiguredEmbedder {
    Hash(HashEmbedder),
    #[cfg(feature = "minilm")]
    MiniLm(MiniLmEmbedder),
}

impl ConfiguredEmbedder {
    pub async fn load(kind: EmbedderKind) -> Result<Self, LoadEmbedderError> {
        let embedder = match kind {
            EmbedderKind::Hash => Self::Hash(HashEmbedder::default()),
            #[cfg(feature = "minilm")]
            EmbedderKind::MiniLm => Self::MiniLm(MiniLmEmbedder::load().await?),
            #[cfg(not(feature = "minilm"))]
            EmbedderKind::MiniLm => return Err(ConfigError::EmbedderUnavailable.into()),
        };
        info!(model = embedder.model_id(), dim = embedder.dimension(), "embedder ready");
        Ok(embedder)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadEmbedderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}

impl Embedder for ConfiguredEmbedder {
    fn model_id(&self) -> &str {
        match self {
            Self::Hash(e) => e.model_id(),
            #[cfg(feature = "minilm")]
            Self::MiniLm(e) => e.model_id(),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Self::Hash(e) => e.dimension(),
            #[cfg(feature = "minilm")]
            Self::MiniLm(e) => e.dimension(),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        match self {
            Self::Hash(e) => e.embed_batch(texts).await,
            #[cfg(feature = "minilm")]
            Self::MiniLm(e) => e.embed_batch(texts).await,
        }
    }
}

/// L2-normalize a vector. Zero vectors are returned unchanged.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < 1e-12 {
        return vec.to_vec();
    }
    vec.iter().map(|x| x / norm).collect()
}

/// Cosine similarity in `[-1.0, 1.0]`; 0.0 when either vector is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have equal length");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom < 1e-12 {
        return 0.0;
    }
    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_unit_length() {
        let n = l2_normalize(&[3.0, 4.0]);
        let norm: f32 = n.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector() {
        let n = l2_normalize(&[0.0; 8]);
        assert!(n.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn cosine_similarity_identical() {
        let a = [1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_opposite() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn hash_config_loads_hash_embedder() {
        let embedder = ConfiguredEmbedder::load(EmbedderKind::Hash).await.unwrap();
        assert!(matches!(embedder, ConfiguredEmbedder::Hash(_)));
        let v = embedder.embed("self-attention").await.unwrap();
        assert_eq!(v.len(), embedder.dimension());
    }

    #[cfg(not(feature = "minilm"))]
    #[tokio::test]
    async fn minilm_without_feature_is_config_error() {
        let result = ConfiguredEmbedder::load(EmbedderKind::MiniLm).await;
        assert!(matches!(
            result,
            Err(LoadEmbedderError::Config(ConfigError::EmbedderUnavailable))
        ));
    }
}
