//! Grounded answer generation from retrieved context.

use tracing::{debug, warn};

use crate::gemini::{GeminiError, Generator};
use crate::index::RetrievedChunk;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error("model returned an empty answer")]
    EmptyAnswer,
}

/// Restricts the model to the supplied context.
pub fn build_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Answer the question based only on the following context:\n{context}\n\nQuestion: {question}\n"
    )
}

/// One generation call, no retry.
pub async fn synthesize(
    generator: &impl Generator,
    question: &str,
    chunks: &[RetrievedChunk],
) -> Result<String, SynthesisError> {
    let prompt = build_prompt(question, chunks);
    debug!(chunks = chunks.len(), prompt_chars = prompt.len(), "synthesizing answer");

    let answer = generator.generate(&prompt).await?;
    let answer = answer.trim();
    if answer.is_empty() {
        warn!("empty answer from generator");
        return Err(SynthesisError::EmptyAnswer);
    }
    Ok(answer.to_string())
}
