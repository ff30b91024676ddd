//! docqa-core
//!
//! Domain types, capability traits and the pieces of the ingestion path that do
//! not depend on a model or a store: discovery, PDF/text loading, chunking and
//! diversity-aware selection.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod mmr;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
