//! Language model clients for docqa.

pub mod gemini;

pub use gemini::GeminiClient;
