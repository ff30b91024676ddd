use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use docqa_core::config::{expand_path, EmbeddingSettings};
use docqa_core::traits::{Embedder, TokenCounter, WordHeuristic};

pub mod bert;
pub mod device;
pub mod fake;
pub mod pool;
pub mod tokens;

pub use bert::BertEmbedder;
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;
pub use tokens::TokenizerCounter;

/// An embedder together with the token counter that matches its tokenizer.
#[derive(Clone)]
pub struct EmbeddingBackend {
    pub embedder: Arc<dyn Embedder>,
    pub counter: Arc<dyn TokenCounter>,
}

pub fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Builds the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the fake one.
pub fn load_embedding(settings: &EmbeddingSettings) -> Result<EmbeddingBackend> {
    if settings.use_fake || fake_requested() {
        info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(EmbeddingBackend {
            embedder: Arc::new(FakeEmbedder::new(settings.fake_dim)),
            counter: Arc::new(WordHeuristic),
        });
    }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
    let model = BertEmbedder::load(&model_dir)?;
    let counter = TokenizerCounter::new(model.tokenizer().clone());
    Ok(EmbeddingBackend { embedder: Arc::new(model), counter: Arc::new(counter) })
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("../models/gist-large-embedding-v0"), PathBuf::from("models/gist-large-embedding-v0")]);
    for dir in candidates {
        if dir.exists() {
            info!(dir = %dir.display(), "using model dir");
            return Ok(dir);
        }
    }
    Err(anyhow!("Could not locate embedding model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}
