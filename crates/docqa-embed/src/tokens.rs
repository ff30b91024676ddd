use tokenizers::Tokenizer;
use tracing::warn;

use docqa_core::traits::{TokenCounter, WordHeuristic};

/// Token counts from the embedding model's own tokenizer, without special tokens.
pub struct TokenizerCounter {
    tokenizer: Tokenizer,
}

impl TokenizerCounter {
    pub fn new(tokenizer: Tokenizer) -> Self { Self { tokenizer } }
}

impl TokenCounter for TokenizerCounter {
    fn count_tokens(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc.get_ids().len(),
            Err(e) => {
                warn!(error = %e, "tokenizer failed, falling back to word heuristic");
                WordHeuristic.count_tokens(text)
            }
        }
    }
}
