//! Process-local vector store. Nothing survives a restart; used by tests and
//! by `store.backend = "memory"`.

use anyhow::{anyhow, bail, ensure, Result};
use async_trait::async_trait;
use std::sync::RwLock;

use docqa_core::mmr::cosine_similarity;
use docqa_core::traits::VectorStore;
use docqa_core::types::{Chunk, ChunkFilter, ChunkId, IndexedChunk, ScoredChunk};

#[derive(Clone, Debug)]
struct Entry {
	chunk: IndexedChunk,
	vector: Vec<f32>,
}

/// Brute-force cosine search over entries kept in insertion order.
#[derive(Debug)]
pub struct InMemoryVectorStore {
	dim: usize,
	entries: RwLock<Vec<Entry>>,
}

impl InMemoryVectorStore {
	pub fn new(dim: usize) -> Self { Self { dim, entries: RwLock::new(Vec::new()) } }

	pub fn dim(&self) -> usize { self.dim }
}

fn poisoned<T>(_: T) -> anyhow::Error { anyhow!("vector store lock poisoned") }

#[async_trait]
impl VectorStore for InMemoryVectorStore {
	async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<ChunkId>> {
		ensure!(chunks.len() == embeddings.len(), "chunks and embeddings length must match");
		crate::check_embeddings(embeddings, self.dim)?;
		let mut entries = self.entries.write().map_err(poisoned)?;
		let mut ids = Vec::with_capacity(chunks.len());
		for (chunk, vector) in chunks.iter().zip(embeddings) {
			let id = uuid::Uuid::new_v4().to_string();
			entries.push(Entry {
				chunk: IndexedChunk { id: id.clone(), content: chunk.content.clone(), metadata: chunk.metadata.clone() },
				vector: vector.clone(),
			});
			ids.push(id);
		}
		Ok(ids)
	}

	async fn get(&self, filter: Option<&ChunkFilter>) -> Result<Vec<IndexedChunk>> {
		let entries = self.entries.read().map_err(poisoned)?;
		Ok(entries
			.iter()
			.filter(|e| filter.map_or(true, |f| f.matches(&e.chunk.metadata)))
			.map(|e| e.chunk.clone())
			.collect())
	}

	async fn delete(&self, ids: &[ChunkId]) -> Result<usize> {
		let mut entries = self.entries.write().map_err(poisoned)?;
		entries.retain(|e| !ids.contains(&e.chunk.id));
		Ok(ids.len())
	}

	async fn count(&self) -> Result<usize> { Ok(self.entries.read().map_err(poisoned)?.len()) }

	async fn similarity_search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
		if query.len() != self.dim { bail!("query dim mismatch: got {} expected {}", query.len(), self.dim); }
		let entries = self.entries.read().map_err(poisoned)?;
		let mut hits: Vec<ScoredChunk> = entries
			.iter()
			.map(|e| ScoredChunk { chunk: e.chunk.clone(), embedding: e.vector.clone(), score: cosine_similarity(query, &e.vector) })
			.collect();
		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		hits.truncate(limit);
		Ok(hits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use docqa_core::types::ChunkMetadata;

	fn chunk(text: &str, path: &str, permanent: bool) -> Chunk {
		let filename = path.rsplit('/').next().unwrap_or(path).to_string();
		Chunk { content: text.into(), metadata: ChunkMetadata { source_path: path.into(), filename, is_permanent: permanent } }
	}

	#[tokio::test]
	async fn search_orders_by_cosine_and_respects_limit() {
		let store = InMemoryVectorStore::new(2);
		store
			.add(
				&[chunk("east", "/d/a.txt", true), chunk("north", "/d/b.txt", true), chunk("north-east", "/d/c.txt", true)],
				&[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
			)
			.await
			.unwrap();
		let hits = store.similarity_search(&[0.0, 1.0], 2).await.unwrap();
		let texts: Vec<_> = hits.iter().map(|h| h.content()).collect();
		assert_eq!(texts, vec!["north", "north-east"]);
		assert!((hits[0].score - 1.0).abs() < 1e-6);
	}

	#[tokio::test]
	async fn filter_and_delete_only_touch_matching_rows() {
		let store = InMemoryVectorStore::new(2);
		store.add(&[chunk("keep", "/d/a.txt", true), chunk("tmp", "/tmp/x/a.txt", false)], &[vec![1.0, 0.0], vec![1.0, 0.0]]).await.unwrap();
		let temp = store.get(Some(&ChunkFilter::temporary_source("/tmp/x/a.txt"))).await.unwrap();
		assert_eq!(temp.len(), 1);
		let ids: Vec<_> = temp.into_iter().map(|c| c.id).collect();
		store.delete(&ids).await.unwrap();
		assert_eq!(store.count().await.unwrap(), 1);
		assert_eq!(store.get(Some(&ChunkFilter::by_filename("a.txt"))).await.unwrap()[0].content, "keep");
	}

	#[tokio::test]
	async fn wrong_dimension_is_rejected() {
		let store = InMemoryVectorStore::new(3);
		assert!(store.add(&[chunk("x", "/d/x.txt", true)], &[vec![1.0]]).await.is_err());
		assert_eq!(store.count().await.unwrap(), 0);
	}
}
