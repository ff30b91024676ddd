//! Domain types shared by the chunker, the vector stores and the pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opaque identifier assigned by a vector store on insertion.
pub type ChunkId = String;

/// A source file known to the pipeline.
///
/// `source_path` is the path string exactly as it was ingested and is the
/// document's identity in the store. `is_permanent` is fixed at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub source_path: String,
    pub filename: String,
    pub is_permanent: bool,
}

impl Document {
    pub fn from_path(path: &Path, is_permanent: bool) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { source_path: path.to_string_lossy().to_string(), filename, is_permanent }
    }
}

/// Metadata attached to every stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_path: String,
    pub filename: String,
    pub is_permanent: bool,
}

impl From<&Document> for ChunkMetadata {
    fn from(doc: &Document) -> Self {
        Self {
            source_path: doc.source_path.clone(),
            filename: doc.filename.clone(),
            is_permanent: doc.is_permanent,
        }
    }
}

impl ChunkMetadata {
    pub fn document(&self) -> Document {
        Document {
            source_path: self.source_path.clone(),
            filename: self.filename.clone(),
            is_permanent: self.is_permanent,
        }
    }
}

/// A chunk produced by the chunker, before it has an id or an embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A chunk as read back from a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A search candidate. `score` is cosine similarity to the query (higher is
/// better); `embedding` is kept so diversity selection can compare candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: IndexedChunk,
    pub embedding: Vec<f32>,
    pub score: f32,
}

impl ScoredChunk {
    pub fn content(&self) -> &str { &self.chunk.content }
}

/// Conjunctive metadata filter for `VectorStore::get`. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFilter {
    pub source_path: Option<String>,
    pub filename: Option<String>,
    pub is_permanent: Option<bool>,
}

impl ChunkFilter {
    pub fn by_filename(filename: impl Into<String>) -> Self {
        Self { filename: Some(filename.into()), ..Self::default() }
    }

    /// Temporary chunks of exactly one source path.
    pub fn temporary_source(source_path: impl Into<String>) -> Self {
        Self { source_path: Some(source_path.into()), is_permanent: Some(false), ..Self::default() }
    }

    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        self.source_path.as_ref().map_or(true, |p| *p == meta.source_path)
            && self.filename.as_ref().map_or(true, |f| *f == meta.filename)
            && self.is_permanent.map_or(true, |p| p == meta.is_permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn document_filename_is_last_component() {
        let doc = Document::from_path(&PathBuf::from("pdfs/cv/resume.pdf"), true);
        assert_eq!(doc.filename, "resume.pdf");
        assert_eq!(doc.source_path, "pdfs/cv/resume.pdf");
    }

    #[test]
    fn filter_fields_are_conjunctive() {
        let meta = ChunkMetadata { source_path: "/tmp/a/x.pdf".into(), filename: "x.pdf".into(), is_permanent: false };
        assert!(ChunkFilter::default().matches(&meta));
        assert!(ChunkFilter::temporary_source("/tmp/a/x.pdf").matches(&meta));
        assert!(!ChunkFilter::temporary_source("/tmp/a").matches(&meta), "no prefix matching");
        let permanent = ChunkMetadata { is_permanent: true, ..meta };
        assert!(!ChunkFilter::temporary_source("/tmp/a/x.pdf").matches(&permanent));
    }
}
