use std::sync::Arc;
use tracing::debug;

use docqa_core::error::{Error, Result};
use docqa_core::traits::{Embedder, Reranker, VectorStore};
use docqa_core::types::ScoredChunk;

/// Separator placed between chunk contents in the context handed to the model.
pub const CONTEXT_SEPARATOR: &str = "\n\n\n";

/// Embeds a question and picks a diverse set of nearby chunks.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    lambda_mult: f32,
    reranker: Option<Arc<dyn Reranker>>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, lambda_mult: f32) -> Self {
        Self { embedder, store, lambda_mult, reranker: None }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// At most `k` chunks chosen by MMR from the `fetch_k` nearest candidates,
    /// in selection order (or reranked order when a reranker is set).
    pub async fn retrieve(&self, question: &str, k: usize, fetch_k: usize) -> Result<Vec<ScoredChunk>> {
        let embedder = Arc::clone(&self.embedder);
        let text = question.to_string();
        let query = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| Error::retrieval(format!("embedding task failed: {e}")))?
            .map_err(|e| Error::retrieval(format!("failed to embed question: {e:#}")))?;

        let mut chunks = self
            .store
            .max_marginal_relevance_search(&query, k, fetch_k, self.lambda_mult)
            .await
            .map_err(|e| Error::retrieval(format!("{e:#}")))?;
        chunks.truncate(k);

        if let Some(reranker) = &self.reranker {
            chunks = reranker.rerank(question, chunks).await.map_err(|e| Error::retrieval(format!("rerank failed: {e:#}")))?;
        }
        debug!(k, fetch_k, returned = chunks.len(), "retrieved chunks");
        Ok(chunks)
    }
}

/// Joins chunk contents in order. Empty input gives `""`, a single chunk its content.
pub fn to_context_string(chunks: &[ScoredChunk]) -> String {
    chunks.iter().map(ScoredChunk::content).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{ChunkMetadata, IndexedChunk};

    fn scored(text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: IndexedChunk {
                id: text.into(),
                content: text.into(),
                metadata: ChunkMetadata { source_path: "a.txt".into(), filename: "a.txt".into(), is_permanent: true },
            },
            embedding: vec![],
            score: 1.0,
        }
    }

    #[test]
    fn context_string_edges() {
        assert_eq!(to_context_string(&[]), "");
        assert_eq!(to_context_string(&[scored("only one\n")]), "only one\n");
        assert_eq!(to_context_string(&[scored("a"), scored("b"), scored("c")]), "a\n\n\nb\n\n\nc");
    }
}
