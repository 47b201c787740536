//! Shared preprocessing rules for embedding providers
//!
//! Every provider applies the same contract before any wire call, so the
//! rules live here rather than in each implementation: the empty string is
//! replaced by a single space (providers reject empty inputs) and each text
//! is truncated to `max_tokens * 4` characters.

/// Apply the empty-string and truncation rules to one input.
pub fn preprocess_text(text: &str, max_tokens: usize) -> String {
    if text.is_empty() {
        return " ".to_string();
    }
    let cap = max_tokens.saturating_mul(4);
    if text.chars().count() > cap {
        text.chars().take(cap).collect()
    } else {
        text.to_string()
    }
}

/// Apply [`preprocess_text`] to every input of a batch.
pub fn preprocess_batch(texts: &[String], max_tokens: usize) -> Vec<String> {
    texts
        .iter()
        .map(|t| preprocess_text(t, max_tokens))
        .collect()
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}
