//! LanceDB connection helpers, filter rendering and row decoding.

use anyhow::{anyhow, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, BooleanArray, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use lancedb::{connect, Connection};

use docqa_core::types::{ChunkFilter, ChunkMetadata, IndexedChunk, ScoredChunk};

pub async fn open_db(uri: &str) -> Result<Connection> {
	Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
	Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

pub fn quote(value: &str) -> String {
	format!("'{}'", value.replace('\'', "''"))
}

/// Renders a metadata filter as a Lance SQL predicate; `None` when it matches everything.
pub fn filter_sql(filter: &ChunkFilter) -> Option<String> {
	let mut clauses = Vec::new();
	if let Some(p) = &filter.source_path { clauses.push(format!("source_path = {}", quote(p))); }
	if let Some(f) = &filter.filename { clauses.push(format!("filename = {}", quote(f))); }
	if let Some(perm) = filter.is_permanent { clauses.push(format!("is_permanent = {}", perm)); }
	if clauses.is_empty() { None } else { Some(clauses.join(" AND ")) }
}

pub fn ids_predicate(ids: &[String]) -> String {
	let list = ids.iter().map(|id| quote(id)).collect::<Vec<_>>().join(",");
	format!("id IN ({})", list)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("{} column missing", name))
}

pub fn indexed_rows(batch: &RecordBatch) -> Result<Vec<IndexedChunk>> {
	let ids = string_col(batch, "id")?;
	let paths = string_col(batch, "source_path")?;
	let names = string_col(batch, "filename")?;
	let contents = string_col(batch, "content")?;
	let permanent = batch
		.column_by_name("is_permanent")
		.and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
		.ok_or_else(|| anyhow!("is_permanent column missing"))?;
	let mut rows = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		rows.push(IndexedChunk {
			id: ids.value(i).to_string(),
			content: contents.value(i).to_string(),
			metadata: ChunkMetadata {
				source_path: paths.value(i).to_string(),
				filename: names.value(i).to_string(),
				is_permanent: permanent.value(i),
			},
		});
	}
	Ok(rows)
}

/// Decodes a vector-search result batch. Lance reports cosine distance in
/// `_distance`; the score is `1 - distance`.
pub fn scored_rows(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
	let rows = indexed_rows(batch)?;
	let vectors = batch
		.column_by_name("vector")
		.and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
		.ok_or_else(|| anyhow!("vector column missing"))?;
	let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());
	let mut out = Vec::with_capacity(rows.len());
	for (i, chunk) in rows.into_iter().enumerate() {
		let embedding = if vectors.is_valid(i) {
			vectors.value(i).as_primitive::<Float32Type>().values().to_vec()
		} else {
			Vec::new()
		};
		let score = distances.map_or(0.0, |d| 1.0 - d.value(i));
		out.push(ScoredChunk { chunk, embedding, score });
	}
	Ok(out)
}
