//! all-MiniLM-L6-v2 sentence embeddings (384-dim) via fastembed.
//!
//! The ONNX model is downloaded on first load and cached by fastembed.
//! Inference is CPU-bound and runs on the blocking pool.

use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::{EmbedError, Embedder};

const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DIMENSION: usize = 384;
const BATCH_SIZE: usize = 32;

#[derive(Clone)]
pub struct MiniLmEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl std::fmt::Debug for MiniLmEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmEmbedder")
            .field("model", &MODEL_ID)
            .field("dim", &DIMENSION)
            .finish_non_exhaustive()
    }
}

impl MiniLmEmbedder {
    pub async fn load() -> Result<Self, EmbedError> {
        info!(model = MODEL_ID, "loading embedding model");
        let model = tokio::task::spawn_blocking(|| {
            TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
            )
        })
        .await?
        .map_err(|e| EmbedError::ModelInit(e.to_string()))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Embedder for MiniLmEmbedder {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let expected = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| EmbedError::Generation("embedding model lock poisoned".into()))?;
            model
                .embed(texts, Some(BATCH_SIZE))
                .map_err(|e| EmbedError::Generation(e.to_string()))
        })
        .await??;

        if vectors.len() != expected {
            return Err(EmbedError::CountMismatch {
                expected,
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::cosine_similarity;

    #[tokio::test]
    #[ignore] // Requires network + model download (~90 MB)
    async fn embeds_with_expected_dimension() {
        let embedder = MiniLmEmbedder::load().await.unwrap();
        let v = embedder.embed("self-attention").await.unwrap();
        assert_eq!(v.len(), DIMENSION);
    }

    #[tokio::test]
    #[ignore] // Requires network + model download
    async fn embedding_is_deterministic() {
        let embedder = MiniLmEmbedder::load().await.unwrap();
        let a = embedder.embed("keys and values").await.unwrap();
        let b = embedder.embed("keys and values").await.unwrap();
        assert!(cosine_similarity(&a, &b) > 0.9999);
    }

    #[tokio::test]
    #[ignore] // Requires network + model download
    async fn paraphrases_are_close() {
        let embedder = MiniLmEmbedder::load().await.unwrap();
        let a = embedder.embed("What is self-attention?").await.unwrap();
        let b = embedder
            .embed("Self-attention relates every token to every other token.")
            .await
            .unwrap();
        let c = embedder.embed("The recipe needs two eggs.").await.unwrap();
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }
}
