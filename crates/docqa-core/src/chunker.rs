//! Token-budget chunking.
//!
//! Text is cut at paragraph boundaries first, oversize paragraphs are cut at
//! sentence boundaries, and sentences that still exceed the budget are packed
//! word by word. With `merge_peers` adjacent pieces are then glued back together
//! as long as the result stays within the budget.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::loader;
use crate::traits::{TokenCounter, WordHeuristic};
use crate::types::{Chunk, ChunkMetadata, Document};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub merge_peers: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 512, merge_peers: true }
    }
}

pub struct Chunker {
    config: ChunkingConfig,
    counter: Arc<dyn TokenCounter>,
}

impl Chunker {
    pub fn new(config: ChunkingConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self { config, counter }
    }

    pub fn with_heuristic(config: ChunkingConfig) -> Self {
        Self::new(config, Arc::new(WordHeuristic))
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Loads `path` and splits it into chunks tagged with the document's metadata.
    pub fn chunk_file(&self, path: &Path, is_permanent: bool) -> Result<Vec<Chunk>> {
        let source = path.to_string_lossy().to_string();
        let pages = loader::load_pages(path).map_err(|e| Error::ingestion(&source, format!("{e:#}")))?;
        let metadata = ChunkMetadata::from(&Document::from_path(path, is_permanent));
        let chunks: Vec<Chunk> = self
            .chunk_pages(&pages)
            .into_iter()
            .map(|content| Chunk { content, metadata: metadata.clone() })
            .collect();
        debug!(path = %source, pages = pages.len(), chunks = chunks.len(), "chunked document");
        Ok(chunks)
    }

    pub fn chunk_pages(&self, pages: &[String]) -> Vec<String> {
        let mut segments = Vec::new();
        for page in pages {
            for paragraph in paragraphs(page) {
                self.split_to_budget(&paragraph, &mut segments);
            }
        }
        if self.config.merge_peers { self.merge_peers(segments) } else { segments }
    }

    fn count(&self, text: &str) -> usize { self.counter.count_tokens(text) }

    fn split_to_budget(&self, paragraph: &str, out: &mut Vec<String>) {
        let max = self.config.max_tokens;
        if self.count(paragraph) <= max {
            out.push(paragraph.to_string());
            return;
        }
        let mut buf = String::new();
        let mut buf_tokens = 0usize;
        for sentence in sentences(paragraph) {
            let tokens = self.count(sentence);
            if tokens > max {
                if !buf.is_empty() { out.push(std::mem::take(&mut buf)); buf_tokens = 0; }
                self.pack_words(sentence, out);
                continue;
            }
            if !buf.is_empty() && buf_tokens + tokens > max {
                out.push(std::mem::take(&mut buf));
                buf_tokens = 0;
            }
            if !buf.is_empty() { buf.push(' '); }
            buf.push_str(sentence);
            buf_tokens += tokens;
        }
        if !buf.is_empty() { out.push(buf); }
    }

    fn pack_words(&self, text: &str, out: &mut Vec<String>) {
        let max = self.config.max_tokens;
        let mut buf: Vec<&str> = Vec::new();
        let mut buf_tokens = 0usize;
        for word in text.split_whitespace() {
            let tokens = self.count(word);
            if !buf.is_empty() && buf_tokens + tokens > max {
                out.push(buf.join(" "));
                buf.clear();
                buf_tokens = 0;
            }
            buf.push(word);
            buf_tokens += tokens;
        }
        if !buf.is_empty() { out.push(buf.join(" ")); }
    }

    fn merge_peers(&self, segments: Vec<String>) -> Vec<String> {
        let mut merged = Vec::with_capacity(segments.len());
        let mut current = String::new();
        for segment in segments {
            if current.is_empty() { current = segment; continue; }
            let candidate = format!("{current}\n{segment}");
            if self.count(&candidate) <= self.config.max_tokens {
                current = candidate;
            } else {
                merged.push(std::mem::replace(&mut current, segment));
            }
        }
        if !current.is_empty() { merged.push(current); }
        merged
    }
}

/// Blank-line separated blocks with inner whitespace collapsed.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() { out.push(collapse(&current)); current.clear(); }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() { out.push(collapse(&current)); }
    out
}

fn collapse(lines: &[&str]) -> String {
    lines.iter().flat_map(|l| l.split_whitespace()).collect::<Vec<_>>().join(" ")
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') { continue; }
        if let Some(&(next_pos, next)) = chars.peek() {
            if next.is_whitespace() {
                let s = text[start..next_pos].trim();
                if !s.is_empty() { out.push(s); }
                start = next_pos;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() { out.push(tail); }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_tokens: usize, merge_peers: bool) -> Chunker {
        Chunker::with_heuristic(ChunkingConfig { max_tokens, merge_peers })
    }

    fn pages(text: &str) -> Vec<String> { vec![text.to_string()] }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunker(512, true).chunk_pages(&pages("Short text\n")), vec!["Short text"]);
    }

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(chunker(512, true).chunk_pages(&pages("\n\n   \n")).is_empty());
        assert!(chunker(512, true).chunk_pages(&[]).is_empty());
    }

    #[test]
    fn small_peers_merge_only_when_enabled() {
        let text = "alpha bravo\n\ncharlie\ndelta\n\necho foxtrot";
        assert_eq!(chunker(50, true).chunk_pages(&pages(text)), vec!["alpha bravo\ncharlie delta\necho foxtrot"]);
        assert_eq!(chunker(50, false).chunk_pages(&pages(text)), vec!["alpha bravo", "charlie delta", "echo foxtrot"]);
    }

    #[test]
    fn oversize_paragraph_is_cut_at_sentences() {
        let text = "One two three. Four five six. Seven eight nine.";
        let chunks = chunker(6, true).chunk_pages(&pages(text));
        assert_eq!(chunks, vec!["One two three.", "Four five six.", "Seven eight nine."]);
    }

    #[test]
    fn run_on_text_is_packed_within_budget() {
        let words: Vec<String> = (0..200).map(|i| format!("word{i}")).collect();
        let c = chunker(40, true);
        let chunks = c.chunk_pages(&pages(&words.join(" ")));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(WordHeuristic.count_tokens(chunk) <= 40, "chunk over budget: {chunk}");
        }
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn sentence_split_keeps_decimals_together() {
        assert_eq!(sentences("Pi is 3.14 roughly. Yes!"), vec!["Pi is 3.14 roughly.", "Yes!"]);
    }
}
