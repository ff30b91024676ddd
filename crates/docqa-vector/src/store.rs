use anyhow::{ensure, Result};
use arrow_array::{BooleanArray, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use docqa_core::traits::VectorStore;
use docqa_core::types::{Chunk, ChunkFilter, ChunkId, IndexedChunk, ScoredChunk};

use crate::schema::build_arrow_schema;
use crate::table::{filter_sql, ids_predicate, indexed_rows, open_db, scored_rows, table_exists};

/// Chunks persisted in one LanceDB table under a local directory.
pub struct LanceVectorStore {
	db: Connection,
	table_name: String,
	dim: usize,
}

impl LanceVectorStore {
	pub async fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		std::fs::create_dir_all(db_path)?;
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		info!(path = %db_path.display(), table = table_name, dim, "opened vector store");
		Ok(Self { db, table_name: table_name.to_string(), dim })
	}

	pub fn dim(&self) -> usize { self.dim }

	async fn table(&self) -> Result<Option<Table>> {
		if !table_exists(&self.db, &self.table_name).await? { return Ok(None); }
		Ok(Some(self.db.open_table(&self.table_name).execute().await?))
	}

	fn to_record_batch(&self, ids: &[ChunkId], chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
		let schema = build_arrow_schema(self.dim as i32);
		let mut paths = Vec::with_capacity(chunks.len());
		let mut names = Vec::with_capacity(chunks.len());
		let mut permanent = Vec::with_capacity(chunks.len());
		let mut contents = Vec::with_capacity(chunks.len());
		for c in chunks {
			paths.push(c.metadata.source_path.clone());
			names.push(c.metadata.filename.clone());
			permanent.push(c.metadata.is_permanent);
			contents.push(c.content.clone());
		}
		let vectors = embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
		let record_batch = RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids.to_vec())),
			Arc::new(StringArray::from(paths)),
			Arc::new(StringArray::from(names)),
			Arc::new(BooleanArray::from(permanent)),
			Arc::new(StringArray::from(contents)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, self.dim as i32)),
		])?;
		Ok(record_batch)
	}
}

#[async_trait]
impl VectorStore for LanceVectorStore {
	async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<ChunkId>> {
		ensure!(chunks.len() == embeddings.len(), "chunks and embeddings length must match");
		if chunks.is_empty() { return Ok(Vec::new()); }
		crate::check_embeddings(embeddings, self.dim)?;
		let ids: Vec<ChunkId> = chunks.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect();
		let record_batch = self.to_record_batch(&ids, chunks, embeddings)?;
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		match self.table().await? {
			Some(table) => { table.add(reader).execute().await?; }
			None => { self.db.create_table(&self.table_name, reader).execute().await?; }
		}
		debug!(table = %self.table_name, rows = ids.len(), "added chunks");
		Ok(ids)
	}

	async fn get(&self, filter: Option<&ChunkFilter>) -> Result<Vec<IndexedChunk>> {
		let Some(table) = self.table().await? else { return Ok(Vec::new()) };
		let mut query = table.query();
		if let Some(predicate) = filter.and_then(filter_sql) { query = query.only_if(predicate); }
		let mut stream = query.execute().await?;
		let mut rows = Vec::new();
		while let Some(batch) = stream.try_next().await? { rows.extend(indexed_rows(&batch)?); }
		Ok(rows)
	}

	async fn delete(&self, ids: &[ChunkId]) -> Result<usize> {
		if ids.is_empty() { return Ok(0); }
		let Some(table) = self.table().await? else { return Ok(0) };
		table.delete(&ids_predicate(ids)).await?;
		debug!(table = %self.table_name, rows = ids.len(), "deleted chunks");
		Ok(ids.len())
	}

	async fn count(&self) -> Result<usize> {
		match self.table().await? {
			Some(table) => Ok(table.count_rows(None).await?),
			None => Ok(0),
		}
	}

	async fn similarity_search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
		if limit == 0 { return Ok(Vec::new()); }
		let Some(table) = self.table().await? else { return Ok(Vec::new()) };
		let mut stream = table
			.vector_search(query.to_vec())?
			.distance_type(DistanceType::Cosine)
			.limit(limit)
			.execute()
			.await?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await? { hits.extend(scored_rows(&batch)?); }
		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		hits.truncate(limit);
		Ok(hits)
	}
}
