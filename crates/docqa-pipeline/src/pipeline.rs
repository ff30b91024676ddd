//! The orchestrator: ingest, query and session cleanup over one vector store.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use docqa_core::chunker::{Chunker, ChunkingConfig};
use docqa_core::config::Settings;
use docqa_core::error::{Error, Result};
use docqa_core::loader;
use docqa_core::traits::{Embedder, LanguageModel, TokenCounter, VectorStore};
use docqa_core::types::{Chunk, ChunkFilter, Document};

use crate::generator::AnswerGenerator;
use crate::rerank::KeywordOverlapReranker;
use crate::retriever::{to_context_string, Retriever};
use crate::session::{Session, SessionDocument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub context: String,
}

/// The pluggable capabilities a pipeline runs on. Without a language model the
/// pipeline can still ingest, list and clean up; only `query` needs one.
#[derive(Clone)]
pub struct Components {
    pub embedder: Arc<dyn Embedder>,
    pub counter: Arc<dyn TokenCounter>,
    pub store: Arc<dyn VectorStore>,
    pub llm: Option<Arc<dyn LanguageModel>>,
}

pub struct Pipeline {
    settings: Settings,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunker: Arc<Chunker>,
    retriever: Retriever,
    generator: Option<AnswerGenerator>,
}

impl Pipeline {
    /// Builds every capability from `settings`, opens the store and makes sure
    /// the reference document is indexed.
    pub async fn initialize(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let embedding = docqa_embed::load_embedding(&settings.embedding)
            .map_err(|e| Error::InvalidConfig(format!("embedding model: {e:#}")))?;
        let store = docqa_vector::open_store(&settings, embedding.embedder.dim())
            .await
            .map_err(|e| Error::storage(format!("{e:#}")))?;
        let llm: Option<Arc<dyn LanguageModel>> = match docqa_llm::GeminiClient::from_settings(&settings.llm) {
            Ok(client) => {
                info!(model = client.model_name(), "language model ready");
                Some(Arc::new(client) as Arc<dyn LanguageModel>)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "language model unavailable, queries will fail");
                None
            }
        };
        info!(store = ?settings.store.backend, "pipeline components ready");
        let components = Components { embedder: embedding.embedder, counter: embedding.counter, store, llm };
        let pipeline = Self::from_components(settings, components)?;
        pipeline.ensure_reference_document().await?;
        Ok(pipeline)
    }

    pub fn from_components(settings: Settings, components: Components) -> Result<Self> {
        settings.validate()?;
        let chunking = ChunkingConfig {
            max_tokens: settings.chunking.max_tokens.unwrap_or_else(|| components.embedder.max_len()),
            merge_peers: settings.chunking.merge_peers,
        };
        let chunker = Arc::new(Chunker::new(chunking, components.counter));
        let mut retriever = Retriever::new(Arc::clone(&components.embedder), Arc::clone(&components.store), settings.retrieval.lambda_mult);
        if settings.retrieval.rerank {
            retriever = retriever.with_reranker(Arc::new(KeywordOverlapReranker));
        }
        let generator = components.llm.map(|llm| AnswerGenerator::new(llm).with_temperature(settings.llm.temperature));
        Ok(Self { settings, store: components.store, embedder: components.embedder, chunker, retriever, generator })
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    /// Indexes the configured reference document as permanent unless a chunk
    /// with its file name is already stored. A missing file only logs a warning.
    pub async fn ensure_reference_document(&self) -> Result<()> {
        let Some(path) = self.settings.reference_document_path() else { return Ok(()) };
        if !path.is_file() {
            warn!(path = %path.display(), "reference document not found, continuing without it");
            return Ok(());
        }
        let filename = Document::from_path(&path, true).filename;
        let existing = self
            .store
            .get(Some(&ChunkFilter::by_filename(filename.clone())))
            .await
            .map_err(|e| Error::storage(format!("{e:#}")))?;
        if !existing.is_empty() {
            debug!(filename = %filename, chunks = existing.len(), "reference document already indexed");
            return Ok(());
        }
        let chunks = self.ingest(&[path.clone()]).await?;
        info!(path = %path.display(), chunks = chunks.len(), "indexed reference document");
        Ok(())
    }

    pub fn discover(&self, folder: &Path) -> Vec<PathBuf> { loader::discover(folder) }

    /// Ingests `paths` as permanent documents. Temporary documents only enter
    /// the store through a [`Session`] (`ingest_temporary`,
    /// `add_temporary_document`) so that `cleanup_session` can reach them.
    pub async fn ingest(&self, paths: &[PathBuf]) -> Result<Vec<Chunk>> { self.ingest_batch(paths, true).await }

    /// Chunks and embeds every path, then writes all chunks in one batch.
    /// Nothing is written if any path fails.
    async fn ingest_batch(&self, paths: &[PathBuf], is_permanent: bool) -> Result<Vec<Chunk>> {
        if paths.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let chunker = Arc::clone(&self.chunker);
        let embedder = Arc::clone(&self.embedder);
        let owned = paths.to_vec();
        let (chunks, embeddings) = tokio::task::spawn_blocking(move || -> Result<(Vec<Chunk>, Vec<Vec<f32>>)> {
            let mut chunks = Vec::new();
            for path in &owned {
                chunks.extend(chunker.chunk_file(path, is_permanent)?);
            }
            if chunks.is_empty() { return Ok((chunks, Vec::new())); }
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).map_err(|e| Error::ingestion(batch_label(&owned), format!("embedding failed: {e:#}")))?;
            if embeddings.len() != chunks.len() {
                return Err(Error::ingestion(batch_label(&owned), format!("embedder returned {} vectors for {} chunks", embeddings.len(), chunks.len())));
            }
            Ok((chunks, embeddings))
        })
        .await
        .map_err(|e| Error::ingestion(batch_label(paths), format!("ingest task failed: {e}")))??;

        if chunks.is_empty() {
            warn!(files = paths.len(), "no text extracted, nothing to index");
            return Ok(chunks);
        }
        self.store.add(&chunks, &embeddings).await.map_err(|e| Error::storage(format!("{e:#}")))?;
        info!(
            files = paths.len(),
            chunks = chunks.len(),
            permanent = is_permanent,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ingested documents"
        );
        Ok(chunks)
    }

    /// Ingests the given paths as temporary documents owned by `session`.
    pub async fn ingest_temporary(&self, session: &mut Session, paths: &[PathBuf]) -> Result<Vec<Chunk>> {
        let chunks = self.ingest_batch(paths, false).await?;
        for path in paths {
            session.register(SessionDocument::new(Document::from_path(path, false), None));
        }
        Ok(chunks)
    }

    /// Ingests every `.pdf`/`.txt` under `folder` (the configured folder when
    /// `None`) as permanent, skipping files already in the store. A missing
    /// folder is `NotFound`.
    pub async fn ingest_folder(&self, folder: Option<&Path>) -> Result<Vec<Chunk>> {
        let folder = folder.map(Path::to_path_buf).unwrap_or_else(|| self.settings.documents_folder());
        if !folder.is_dir() {
            return Err(Error::NotFound(format!("documents folder {}", folder.display())));
        }
        let discovered = self.discover(&folder);
        let known: Vec<String> = self.list_documents().await?.into_iter().map(|d| d.source_path).collect();
        let pending: Vec<PathBuf> = discovered
            .into_iter()
            .filter(|p| !known.contains(&p.to_string_lossy().to_string()))
            .collect();
        info!(folder = %folder.display(), pending = pending.len(), already_indexed = known.len(), "ingesting folder");
        self.ingest(&pending).await
    }

    /// Writes an uploaded file into a fresh scratch directory and ingests it as
    /// temporary. Uploading a file name the session already holds returns the
    /// existing document.
    pub async fn add_temporary_document(&self, session: &mut Session, bytes: &[u8], filename: &str) -> Result<Document> {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::ingestion(filename, "invalid file name"))?;
        if let Some(existing) = session.find_by_filename(&name) {
            debug!(session = %session.id(), filename = %name, "document already in session");
            return Ok(existing.document.clone());
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("docqa-");
        let scratch = match self.settings.scratch_dir() {
            Some(dir) => std::fs::create_dir_all(&dir).and_then(|_| builder.tempdir_in(&dir)),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::storage(format!("failed to create scratch directory: {e}")))?;
        let path = scratch.path().join(&name);
        std::fs::write(&path, bytes).map_err(|e| Error::storage(format!("failed to write {}: {e}", path.display())))?;

        let chunks = self.ingest_batch(&[path.clone()], false).await?;
        let document = Document::from_path(&path, false);
        info!(session = %session.id(), filename = %name, chunks = chunks.len(), "added temporary document");
        session.register(SessionDocument::new(document.clone(), Some(scratch)));
        Ok(document)
    }

    pub async fn query(&self, question: &str) -> Result<QueryResponse> {
        let start = Instant::now();
        let Some(generator) = &self.generator else {
            return Err(Error::InvalidConfig(format!("no language model configured (check {})", self.settings.llm.api_key_env)));
        };
        let count = self.store.count().await.map_err(|e| Error::retrieval(format!("{e:#}")))?;
        if count == 0 {
            return Err(Error::retrieval("vector store is empty"));
        }
        let retrieval = &self.settings.retrieval;
        let chunks = self.retriever.retrieve(question, retrieval.k, retrieval.fetch_k).await?;
        let context = to_context_string(&chunks);
        let answer = generator.generate(question, &context).await?;
        info!(chunks = chunks.len(), elapsed_ms = start.elapsed().as_millis() as u64, "answered question");
        Ok(QueryResponse { answer, context })
    }

    /// Removes the session's temporary chunks and scratch directories. Failures
    /// are logged per document and do not stop the rest. Returns the number of
    /// chunks deleted.
    pub async fn cleanup_session(&self, session: &mut Session) -> usize {
        let mut removed = 0usize;
        for mut entry in session.drain() {
            let source = entry.document.source_path.clone();
            match self.store.get(Some(&ChunkFilter::temporary_source(source.clone()))).await {
                Ok(rows) => {
                    let ids: Vec<String> = rows.into_iter().map(|c| c.id).collect();
                    match self.store.delete(&ids).await {
                        Ok(n) => removed += n,
                        Err(e) => error!(session = %session.id(), path = %source, error = %e, "failed to delete chunks"),
                    }
                }
                Err(e) => error!(session = %session.id(), path = %source, error = %e, "failed to look up chunks"),
            }
            if let Some(dir) = entry.take_scratch() {
                let shown = dir.path().display().to_string();
                if let Err(e) = dir.close() {
                    warn!(session = %session.id(), dir = %shown, error = %e, "failed to remove scratch directory");
                }
            }
        }
        info!(session = %session.id(), chunks = removed, "cleaned up session");
        removed
    }

    /// Distinct documents in the store, ordered by source path.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = self.store.get(None).await.map_err(|e| Error::storage(format!("{e:#}")))?;
        let mut docs: BTreeMap<String, Document> = BTreeMap::new();
        for row in rows {
            docs.entry(row.metadata.source_path.clone()).or_insert_with(|| row.metadata.document());
        }
        Ok(docs.into_values().collect())
    }

    pub async fn chunk_count(&self) -> Result<usize> {
        self.store.count().await.map_err(|e| Error::storage(format!("{e:#}")))
    }
}

fn batch_label(paths: &[PathBuf]) -> String {
    match paths {
        [one] => one.display().to_string(),
        many => format!("{} files starting with {}", many.len(), many.first().map(|p| p.display().to_string()).unwrap_or_default()),
    }
}
