//! docqa-pipeline
//!
//! Retrieve-then-generate over the vector store, plus the document lifecycle:
//! permanent documents ingested from a folder, temporary ones uploaded into a
//! caller-owned [`Session`] and removed again by `cleanup_session`.

pub mod generator;
pub mod pipeline;
pub mod rerank;
pub mod retriever;
pub mod session;

pub use generator::AnswerGenerator;
pub use pipeline::{Components, Pipeline, QueryResponse};
pub use rerank::KeywordOverlapReranker;
pub use retriever::{to_context_string, Retriever};
pub use session::{Session, SessionDocument, SessionId};
