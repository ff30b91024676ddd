use async_trait::async_trait;

use crate::mmr;
use crate::types::{Chunk, ChunkFilter, ChunkId, IndexedChunk, ScoredChunk};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Counts tokens the way the embedding model will see them.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Word-count approximation used when no tokenizer is loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordHeuristic;

impl TokenCounter for WordHeuristic {
    fn count_tokens(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f32 / 0.75).ceil() as usize
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Writes `chunks` with their `embeddings` as a single batch and returns the
    /// ids assigned to them, in input order.
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> anyhow::Result<Vec<ChunkId>>;

    async fn get(&self, filter: Option<&ChunkFilter>) -> anyhow::Result<Vec<IndexedChunk>>;

    /// Deletes the given ids and returns how many were requested.
    async fn delete(&self, ids: &[ChunkId]) -> anyhow::Result<usize>;

    async fn count(&self) -> anyhow::Result<usize>;

    /// Nearest neighbours of `query`, best first, at most `limit` of them.
    async fn similarity_search(&self, query: &[f32], limit: usize) -> anyhow::Result<Vec<ScoredChunk>>;

    /// Picks `k` of the `fetch_k` nearest candidates by maximal marginal relevance.
    async fn max_marginal_relevance_search(
        &self,
        query: &[f32],
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> anyhow::Result<Vec<ScoredChunk>> {
        let candidates = self.similarity_search(query, fetch_k.max(k)).await?;
        Ok(mmr::select(query, candidates, k, lambda_mult))
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, prompt: &str, temperature: f32) -> anyhow::Result<String>;
}

/// Optional second ranking stage applied to retrieved chunks.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>) -> anyhow::Result<Vec<ScoredChunk>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_rounds_up() {
        assert_eq!(WordHeuristic.count_tokens(""), 0);
        assert_eq!(WordHeuristic.count_tokens("one"), 2);
        assert_eq!(WordHeuristic.count_tokens("one two three"), 4);
    }
}
