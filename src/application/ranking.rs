//! Multi-factor result ranking
//!
//! Blends the store's vector similarity with recency, import-frequency and
//! term-frequency signals:
//!
//! ```text
//! final = (w_v·v̂ + w_r·r + w_i·i + w_t·t) / (w_v + w_r + w_i + w_t)
//! ```
//!
//! where `v̂` is the vector score min-max normalized across the result set,
//! `r` halves every `recency_half_life_days`, `i` scales the document's
//! import count by the collection maximum, and `t` squashes query-term
//! occurrences through a sigmoid. Every factor and the blend stay in
//! `[0, 1]`. Ordering is deterministic: descending score, then ascending
//! relative path, then ascending start line.

use crate::domain::types::{
    RankingConfig, ScoredDocument, META_IMPORT_COUNT, META_MAX_IMPORT_COUNT,
};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Sigmoid slope for the term-frequency factor, calibrated so a single
/// match in a 50-token chunk scores about 0.2.
const TERM_FREQ_SLOPE: f64 = 20.0;

/// Rescale and reorder a result set.
///
/// Falls back to the raw store ordering (with deterministic tie-breakers)
/// when ranking is disabled, the query is empty, every vector score is zero,
/// or the configured weights sum to zero.
pub fn apply_ranking(
    mut results: Vec<ScoredDocument>,
    query: &str,
    config: &RankingConfig,
    now_ms: i64,
) -> Vec<ScoredDocument> {
    let weight_sum = config.vector_weight
        + config.recency_weight
        + config.import_weight
        + config.term_freq_weight;
    let applicable = config.enabled
        && !query.trim().is_empty()
        && weight_sum > 0.0
        && results.iter().any(|r| r.score > 0.0);

    if applicable {
        let (min, max) = results
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r.score), hi.max(r.score))
            });
        let spread = (max - min) as f64;

        for result in &mut results {
            let v = if spread > f64::EPSILON {
                (result.score - min) as f64 / spread
            } else {
                1.0
            };
            let r = recency_factor(
                result.document.mtime_ms,
                now_ms,
                config.recency_half_life_days,
            );
            let i = import_factor(&result.document);
            let t = term_frequency_factor(query, &result.document.content);

            let blended = (config.vector_weight * v
                + config.recency_weight * r
                + config.import_weight * i
                + config.term_freq_weight * t)
                / weight_sum;
            result.score = blended.clamp(0.0, 1.0) as f32;
        }
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document.relative_path.cmp(&b.document.relative_path))
            .then_with(|| a.document.start_line.cmp(&b.document.start_line))
    });
    results
}

/// Half-life decay over file age: `2^(-Δdays / H)`, clamped to `[0, 1]`.
///
/// A non-positive half-life degenerates to a step function: `1` for files
/// modified now or in the future, `0` otherwise.
pub(crate) fn recency_factor(mtime_ms: i64, now_ms: i64, half_life_days: f64) -> f64 {
    let delta_days = ((now_ms - mtime_ms) as f64 / MS_PER_DAY).max(0.0);
    if half_life_days <= 0.0 {
        return if delta_days > 0.0 { 0.0 } else { 1.0 };
    }
    2f64.powf(-delta_days / half_life_days).clamp(0.0, 1.0)
}

/// `clamp(import_count / max_import_count, 0, 1)`; zero when either side is
/// zero or missing.
pub(crate) fn import_factor(doc: &crate::domain::types::VectorDocument) -> f64 {
    let count = doc.metadata_u64(META_IMPORT_COUNT).unwrap_or(0);
    let max = doc.metadata_u64(META_MAX_IMPORT_COUNT).unwrap_or(0);
    if count == 0 || max == 0 {
        return 0.0;
    }
    (count as f64 / max as f64).clamp(0.0, 1.0)
}

/// Sigmoid-squashed density of query-term occurrences in the chunk.
pub(crate) fn term_frequency_factor(query: &str, content: &str) -> f64 {
    let query_lower = query.to_lowercase();
    let terms: Vec<&str> = query_lower.split_whitespace().collect();
    if terms.is_empty() {
        return 0.0;
    }
    let content_lower = content.to_lowercase();
    let occurrences: usize = terms
        .iter()
        .map(|term| content_lower.matches(term).count())
        .sum();
    if occurrences == 0 {
        return 0.0;
    }
    let word_count = content.split_whitespace().count().max(1);
    let x = TERM_FREQ_SLOPE * occurrences as f64 / word_count as f64;
    2.0 * (sigmoid(x) - 0.5)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
