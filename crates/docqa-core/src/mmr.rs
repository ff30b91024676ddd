//! Maximal marginal relevance selection over pre-fetched candidates.
//!
//! The first pick is the candidate most similar to the query. Every following
//! pick maximises `lambda * sim(query, c) - (1 - lambda) * max sim(c, picked)`,
//! so `lambda = 1.0` is plain relevance order and `lambda = 0.0` is maximal
//! diversity.

use crate::types::ScoredChunk;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() { return 0.0; }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON { return 0.0; }
    dot / (na * nb)
}

/// Returns at most `k` of `candidates`, in selection order.
pub fn select(query: &[f32], candidates: Vec<ScoredChunk>, k: usize, lambda_mult: f32) -> Vec<ScoredChunk> {
    if k == 0 || candidates.is_empty() { return Vec::new(); }
    let lambda = lambda_mult.clamp(0.0, 1.0);
    let relevance: Vec<f32> = candidates.iter().map(|c| cosine_similarity(query, &c.embedding)).collect();

    let mut picked: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    while picked.len() < k && !remaining.is_empty() {
        let mut best_pos = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for (pos, &idx) in remaining.iter().enumerate() {
            let redundancy = picked
                .iter()
                .map(|&p| cosine_similarity(&candidates[idx].embedding, &candidates[p].embedding))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if picked.is_empty() { 0.0 } else { redundancy };
            let score = lambda * relevance[idx] - (1.0 - lambda) * redundancy;
            if score > best_score { best_score = score; best_pos = pos; }
        }
        picked.push(remaining.remove(best_pos));
    }

    let mut slots: Vec<Option<ScoredChunk>> = candidates.into_iter().map(Some).collect();
    picked.into_iter().filter_map(|i| slots[i].take()).collect()
}
