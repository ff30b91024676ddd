use anyhow::Result;
use async_trait::async_trait;

use docqa_core::traits::Reranker;
use docqa_core::types::ScoredChunk;

/// Blends vector similarity (70%) with the share of query words found in the
/// chunk text (30%) and reorders by the blended score.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordOverlapReranker;

impl KeywordOverlapReranker {
    pub fn blended_score(query_words: &[String], chunk: &ScoredChunk) -> f32 {
        if query_words.is_empty() { return chunk.score; }
        let content = chunk.content().to_lowercase();
        let hits = query_words.iter().filter(|w| content.contains(w.as_str())).count();
        chunk.score * 0.7 + (hits as f32 / query_words.len() as f32) * 0.3
    }
}

#[async_trait]
impl Reranker for KeywordOverlapReranker {
    async fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>) -> Result<Vec<ScoredChunk>> {
        let query_words: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .map(str::to_lowercase)
            .collect();
        let mut scored: Vec<ScoredChunk> = candidates
            .into_iter()
            .map(|mut c| {
                c.score = Self::blended_score(&query_words, &c);
                c
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }
}
