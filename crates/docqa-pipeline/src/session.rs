//! Per-session registry of temporary documents.
//!
//! A [`Session`] is owned by the caller (one per chat, request scope or CLI
//! run) and passed by `&mut` to every operation that adds or removes its
//! documents. Each entry keeps the scratch directory its upload was written to;
//! the directory is removed when the entry is cleaned up or dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tempfile::TempDir;

use docqa_core::types::Document;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn generate() -> Self { Self(uuid::Uuid::new_v4().to_string()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self { Self::new(s) }
}

/// A temporary document and the filesystem resources backing it.
#[derive(Debug)]
pub struct SessionDocument {
    pub document: Document,
    scratch: Option<TempDir>,
}

impl SessionDocument {
    pub(crate) fn new(document: Document, scratch: Option<TempDir>) -> Self { Self { document, scratch } }

    pub fn scratch_path(&self) -> Option<&Path> { self.scratch.as_ref().map(TempDir::path) }

    pub(crate) fn take_scratch(&mut self) -> Option<TempDir> { self.scratch.take() }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    documents: BTreeMap<String, SessionDocument>,
}

impl Session {
    pub fn new(id: SessionId) -> Self { Self { id, documents: BTreeMap::new() } }

    pub fn id(&self) -> &SessionId { &self.id }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn len(&self) -> usize { self.documents.len() }

    /// File names of the session's temporary documents, ordered by source path.
    pub fn documents(&self) -> Vec<&str> {
        self.documents.values().map(|d| d.document.filename.as_str()).collect()
    }

    pub fn get(&self, source_path: &str) -> Option<&SessionDocument> { self.documents.get(source_path) }

    pub fn find_by_filename(&self, filename: &str) -> Option<&SessionDocument> {
        self.documents.values().find(|d| d.document.filename == filename)
    }

    pub(crate) fn register(&mut self, entry: SessionDocument) {
        self.documents.insert(entry.document.source_path.clone(), entry);
    }

    pub(crate) fn drain(&mut self) -> Vec<SessionDocument> {
        std::mem::take(&mut self.documents).into_values().collect()
    }
}
