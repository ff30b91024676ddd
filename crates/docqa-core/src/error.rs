use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to ingest {path}: {reason}")]
    Ingestion { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn ingestion(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Ingestion { path: path.into(), reason: reason.to_string() }
    }

    pub fn storage(reason: impl std::fmt::Display) -> Self { Error::Storage(reason.to_string()) }

    pub fn retrieval(reason: impl std::fmt::Display) -> Self { Error::Retrieval(reason.to_string()) }

    pub fn generation(reason: impl std::fmt::Display) -> Self { Error::Generation(reason.to_string()) }

    /// Whether a caller may reasonably retry the same call unchanged.
    ///
    /// The pipeline itself never retries; this is a hint for the layer above.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Retrieval(_) | Error::Generation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingestion_message_names_the_file() {
        let err = Error::ingestion("/tmp/x.pdf", "not a PDF");
        assert_eq!(err.to_string(), "Failed to ingest /tmp/x.pdf: not a PDF");
    }

    #[test]
    fn only_runtime_failures_are_retryable() {
        assert!(Error::generation("quota").is_retryable());
        assert!(Error::storage("disk full").is_retryable());
        assert!(!Error::ingestion("a.txt", "bad utf8").is_retryable());
        assert!(!Error::InvalidConfig("k".into()).is_retryable());
    }
}
