use tracing::warn;

use super::types::GenerateContentResponse;

/// Text of the first candidate, with all of its parts joined. `None` when the
/// model returned nothing usable.
pub fn extract_answer(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let answer = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty());

    if answer.is_none() {
        warn!(
            finish_reason = candidate.and_then(|c| c.finish_reason.as_deref()),
            "Gemini returned empty answer (safety filter or empty response)"
        );
    }
    answer
}
