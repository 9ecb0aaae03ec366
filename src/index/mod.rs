//! In-memory chunk index and similarity retrieval.

pub mod chunker;

pub use chunker::Chunker;

use tracing::debug;

use crate::embed::{EmbedError, Embedder, cosine_similarity};

const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("index was built with {expected}, query embedder is {got}")]
    EmbedderMismatch { expected: String, got: String },
}

/// Collapse every whitespace run, line breaks included, to a single space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Write-once store of chunk texts and their embeddings.
///
/// Only [`ChunkIndex::build`] creates one, and it returns after every chunk
/// is embedded, so a partially built index is never observable.
#[derive(Debug)]
pub struct ChunkIndex {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    model_id: String,
    dimension: usize,
}

impl ChunkIndex {
    pub async fn build(
        text: &str,
        chunker: &Chunker,
        embedder: &impl Embedder,
    ) -> Result<Self, IndexError> {
        let chunks: Vec<String> = chunker
            .split(text)
            .into_iter()
            .map(|span| text[span].to_string())
            .collect();

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let vectors = embedder.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbedError::CountMismatch {
                    expected: batch.len(),
                    got: vectors.len(),
                }
                .into());
            }
            embeddings.extend(vectors);
        }

        debug!(chunks = chunks.len(), model = embedder.model_id(), "index built");
        Ok(Self {
            chunks,
            embeddings,
            model_id: embedder.model_id().to_string(),
            dimension: embedder.dimension(),
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
    /// Insertion order in the index.
    pub position: usize,
}

/// Top `k` chunks by cosine similarity to `question`, best first.
pub async fn retrieve(
    index: &ChunkIndex,
    embedder: &impl Embedder,
    question: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>, IndexError> {
    if embedder.model_id() != index.model_id || embedder.dimension() != index.dimension {
        return Err(IndexError::EmbedderMismatch {
            expected: format!("{} ({}d)", index.model_id, index.dimension),
            got: format!("{} ({}d)", embedder.model_id(), embedder.dimension()),
        });
    }
    if index.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let query = embedder.embed(question).await?;
    let mut scored: Vec<(usize, f32)> = index
        .embeddings
        .iter()
        .map(|v| cosine_similarity(&query, v))
        .enumerate()
        .collect();
    // Stable: equal scores keep insertion order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);

    Ok(scored
        .into_iter()
        .map(|(position, score)| RetrievedChunk {
            text: index.chunks[position].clone(),
            score,
            position,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;

    const CORPUS: &str = "The self-attention mechanism relates queries to keys and values. \
        Every position attends to every other position in one layer.\n\n\
        Convolutional networks slide learned kernels over images to detect edges. \
        Pooling layers reduce the spatial resolution of feature maps.\n\n\
        Recurrent networks process tokens one step at a time. \
        Gradients can vanish over long sequences.";

    async fn small_index(embedder: &HashEmbedder) -> ChunkIndex {
        ChunkIndex::build(&normalize_text(CORPUS), &Chunker::new(80, 10), embedder)
            .await
            .unwrap()
    }

    #[test]
    fn normalize_collapses_whitespace_and_line_breaks() {
        assert_eq!(
            normalize_text("  Attention\n\nis \t all\r\nyou   need  "),
            "Attention is all you need"
        );
        assert_eq!(normalize_text(" \n "), "");
    }

    #[tokio::test]
    async fn build_embeds_every_chunk() {
        let embedder = HashEmbedder::default();
        let index = small_index(&embedder).await;
        assert!(index.len() > 1);
        assert_eq!(index.embeddings.len(), index.len());
        assert_eq!(index.model_id(), "fnv-hash-384");
    }

    #[tokio::test]
    async fn build_across_multiple_batches() {
        let embedder = HashEmbedder::new(32);
        let text = "word ".repeat(2_000);
        let index = ChunkIndex::build(&text, &Chunker::new(20, 4), &embedder)
            .await
            .unwrap();
        assert!(index.len() > EMBED_BATCH_SIZE);
        assert_eq!(index.embeddings.len(), index.len());
    }

    #[tokio::test]
    async fn retrieve_returns_min_k_len_sorted_by_score() {
        let embedder = HashEmbedder::default();
        let index = small_index(&embedder).await;

        let hits = retrieve(&index, &embedder, "what is self-attention", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].text.contains("self-attention"));

        let all = retrieve(&index, &embedder, "what is self-attention", 100).await.unwrap();
        assert_eq!(all.len(), index.len());
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let embedder = HashEmbedder::default();
        let text = "alpha beta. ".repeat(60);
        let index = ChunkIndex::build(&normalize_text(&text), &Chunker::new(40, 5), &embedder)
            .await
            .unwrap();

        // A question with no word tokens embeds to zero, so every score is 0.0.
        let hits = retrieve(&index, &embedder, "?!", index.len()).await.unwrap();
        assert!(hits.iter().all(|h| h.score == 0.0));
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[tokio::test]
    async fn empty_index_retrieves_nothing() {
        let embedder = HashEmbedder::default();
        let index = ChunkIndex::build("", &Chunker::default(), &embedder).await.unwrap();
        assert!(index.is_empty());
        let hits = retrieve(&index, &embedder, "anything", 7).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn mismatched_embedder_is_rejected() {
        let index = small_index(&HashEmbedder::default()).await;
        let other = HashEmbedder::new(128);
        let err = retrieve(&index, &other, "self-attention", 3).await.unwrap_err();
        assert!(matches!(err, IndexError::EmbedderMismatch { .. }));
    }
}
