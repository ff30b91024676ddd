//! Vector store backends for docqa: a LanceDB table on disk and an in-memory
//! store for tests and throwaway runs.

use anyhow::Result;
use std::sync::Arc;

use docqa_core::config::{Settings, StoreBackend};
use docqa_core::traits::VectorStore;

pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use memory::InMemoryVectorStore;
pub use store::LanceVectorStore;

/// Rejects a batch whose vectors are not `dim` wide or hold NaN/infinite values.
pub(crate) fn check_embeddings(embeddings: &[Vec<f32>], dim: usize) -> Result<()> {
	for v in embeddings {
		if v.len() != dim { anyhow::bail!("dim mismatch: got {} expected {}", v.len(), dim); }
		if v.iter().any(|x| !x.is_finite()) { anyhow::bail!("embedding contains NaN or infinite values"); }
	}
	Ok(())
}

/// Opens the backend named in `settings.store` for embeddings of width `dim`.
pub async fn open_store(settings: &Settings, dim: usize) -> Result<Arc<dyn VectorStore>> {
	match settings.store.backend {
		StoreBackend::Lancedb => {
			let store = LanceVectorStore::open(&settings.persist_dir(), &settings.store.collection, dim).await?;
			Ok(Arc::new(store))
		}
		StoreBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new(dim))),
	}
}
