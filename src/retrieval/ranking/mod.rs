
use tracing::debug;

use crate::store::EmbeddingRecord;
use crate::tokenizer::Tokenizer;

/// Distance assigned when cosine similarity is undefined
pub const MAX_COSINE_DISTANCE: f32 = 2.0;

/// A stored record scored against one query
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub title: String,
    pub content: String,
    /// Token length of `content`, measured at rank time
    pub token_count: usize,
    /// Cosine distance to the query, in `[0, 2]`
    pub distance: f32,
}

/// Cosine similarity of two vectors.
///
/// Returns `None` when either vector is empty or has zero norm, or when the
/// lengths differ.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot = x.mul_add(y, dot);
        norm_a = x.mul_add(x, norm_a);
        norm_b = y.mul_add(y, norm_b);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }

    let similarity = dot / denom;
    similarity.is_finite().then_some(similarity as f32)
}

/// `1 - cosine_similarity`, clamped to `[0, 2]`; undefined similarity is the maximal distance
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b).map_or(MAX_COSINE_DISTANCE, |similarity| {
        (1.0 - similarity).clamp(0.0, MAX_COSINE_DISTANCE)
    })
}

/// Score every record against the query and order them nearest first.
///
/// The sort is stable, so records at equal distance keep their input order.
#[inline]
pub fn rank<T: Tokenizer + ?Sized>(
    query_embedding: &[f32],
    records: &[EmbeddingRecord],
    tokenizer: &T,
) -> Vec<RankedRecord> {
    let mut ranked: Vec<RankedRecord> = records
        .iter()
        .map(|record| RankedRecord {
            title: record.title.clone(),
            content: record.content.clone(),
            token_count: tokenizer.count(&record.content),
            distance: cosine_distance(&record.embedding, query_embedding),
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    if let Some(nearest) = ranked.first() {
        debug!(
            "Ranked {} records, nearest '{}' at distance {:.4}",
            ranked.len(),
            nearest.title,
            nearest.distance
        );
    }

    ranked
}
