use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    /// Extracts and validates the typed settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub documents: DocumentSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Lancedb,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub persist_dir: String,
    pub collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { backend: StoreBackend::Lancedb, persist_dir: "./docqa_db".to_string(), collection: "collection".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub folder: String,
    /// File name of the document that must always be indexed, resolved against `folder`.
    pub reference_document: Option<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self { Self { folder: "pdfs".to_string(), reference_document: None } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Token budget per chunk. `None` uses the embedder's maximum input length.
    pub max_tokens: Option<usize>,
    pub merge_peers: bool,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { max_tokens: None, merge_peers: true } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
    pub fetch_k: usize,
    pub lambda_mult: f32,
    pub rerank: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { k: 10, fetch_k: 20, lambda_mult: 0.5, rerank: false } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { model_dir: None, use_fake: false, fake_dim: 1024 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.0,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Where uploaded documents are materialised. System temp dir when unset.
    pub scratch_dir: Option<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.k == 0 { return Err(Error::InvalidConfig("retrieval.k must be at least 1".into())); }
        if r.fetch_k < r.k {
            return Err(Error::InvalidConfig(format!("retrieval.fetch_k ({}) must be >= retrieval.k ({})", r.fetch_k, r.k)));
        }
        if !(0.0..=1.0).contains(&r.lambda_mult) {
            return Err(Error::InvalidConfig(format!("retrieval.lambda_mult must be within [0, 1], got {}", r.lambda_mult)));
        }
        if self.chunking.max_tokens == Some(0) {
            return Err(Error::InvalidConfig("chunking.max_tokens must be positive".into()));
        }
        if self.store.collection.trim().is_empty() {
            return Err(Error::InvalidConfig("store.collection must not be empty".into()));
        }
        Ok(())
    }

    pub fn persist_dir(&self) -> PathBuf { expand_path(&self.store.persist_dir) }

    pub fn documents_folder(&self) -> PathBuf { expand_path(&self.documents.folder) }

    pub fn reference_document_path(&self) -> Option<PathBuf> {
        let folder = self.documents_folder();
        self.documents.reference_document.as_ref().map(|name| resolve_with_base(&folder, name))
    }

    pub fn scratch_dir(&self) -> Option<PathBuf> { self.session.scratch_dir.as_ref().map(expand_path) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(s: &str) -> Result<Settings> {
        Config::from_figment(Figment::new().merge(Toml::string(s))).settings()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let s = from_toml("").expect("defaults");
        assert_eq!(s.retrieval.k, 10);
        assert_eq!(s.retrieval.fetch_k, 20);
        assert_eq!(s.store.backend, StoreBackend::Lancedb);
        assert_eq!(s.llm.model, "gemini-2.0-flash");
        assert!(s.chunking.merge_peers);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let s = from_toml("[retrieval]\nk = 4\n[store]\nbackend = \"memory\"\n").expect("settings");
        assert_eq!(s.retrieval.k, 4);
        assert_eq!(s.retrieval.fetch_k, 20);
        assert_eq!(s.store.backend, StoreBackend::Memory);
        assert_eq!(s.store.collection, "collection");
    }

    #[test]
    fn fetch_k_below_k_is_rejected() {
        let err = from_toml("[retrieval]\nk = 5\nfetch_k = 2\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn reference_document_resolves_against_folder() {
        let s = from_toml("[documents]\nfolder = \"/data/pdfs\"\nreference_document = \"resume.pdf\"\n").expect("settings");
        assert_eq!(s.reference_document_path(), Some(PathBuf::from("/data/pdfs/resume.pdf")));
    }
}
