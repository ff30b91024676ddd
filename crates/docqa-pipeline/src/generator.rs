//! Prompt rendering and the single language-model call per question.

use std::sync::Arc;
use tracing::debug;

use docqa_core::error::{Error, Result};
use docqa_core::traits::LanguageModel;

pub const PROMPT_TEMPLATE: &str = "\
You are a helpful assistant answering questions about the user's documents.
Answer the question using only the context below.

If the context does not contain the information needed, say clearly that the
documents do not cover it. Then point out the closest related information the
context does contain and explain how it might transfer to the question.

Context:
{context}

Question:
{question}

Answer:";

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";

/// Fills the template slots in one pass over the template, so slot-like text
/// inside the context or question is copied through untouched.
pub fn render_prompt(context: &str, question: &str) -> String {
    let mut out = String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = PROMPT_TEMPLATE;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        if let Some(after) = tail.strip_prefix(CONTEXT_SLOT) {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUESTION_SLOT) {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self { Self { llm, temperature: 0.0 } }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns the model's raw text for `question` answered from `context`.
    pub async fn generate(&self, question: &str, context: &str) -> Result<String> {
        let prompt = render_prompt(context, question);
        debug!(prompt_chars = prompt.len(), temperature = self.temperature, "calling language model");
        self.llm.complete(&prompt, self.temperature).await.map_err(|e| Error::generation(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Model {}

        #[async_trait]
        impl LanguageModel for Model {
            fn model_name(&self) -> &str;
            async fn complete(&self, prompt: &str, temperature: f32) -> anyhow::Result<String>;
        }
    }

    #[test]
    fn prompt_fills_both_slots_once() {
        let p = render_prompt("the context {question}", "what?");
        assert!(p.contains("Context:\nthe context {question}\n"));
        assert!(p.contains("Question:\nwhat?\n"));
        assert!(!p.contains("{context}"));
    }

    #[test]
    fn slot_text_inside_context_is_left_alone() {
        let p = render_prompt("Use {question} in your template engine.", "What is Jinja?");
        assert!(p.contains("Context:\nUse {question} in your template engine.\n"), "{p}");
        assert!(p.contains("Question:\nWhat is Jinja?\n"), "{p}");
        assert_eq!(p.matches("What is Jinja?").count(), 1);
    }

    #[test]
    fn question_may_mention_context_slot() {
        let p = render_prompt("plain notes", "what does {context} mean?");
        assert!(p.contains("Context:\nplain notes\n"));
        assert!(p.contains("Question:\nwhat does {context} mean?\n"));
    }

    #[tokio::test]
    async fn calls_model_at_temperature_zero() {
        let mut model = MockModel::new();
        model
            .expect_complete()
            .withf(|prompt, temperature| prompt.contains("Solar panels") && prompt.contains("How big?") && *temperature == 0.0)
            .times(1)
            .returning(|_, _| Ok("About 2 m².".to_string()));
        let generator = AnswerGenerator::new(Arc::new(model));
        assert_eq!(generator.generate("How big?", "Solar panels are 2 m² each.").await.unwrap(), "About 2 m².");
    }

    #[tokio::test]
    async fn model_failure_is_a_generation_error() {
        let mut model = MockModel::new();
        model.expect_complete().returning(|_, _| Err(anyhow::anyhow!("quota exceeded")));
        let err = AnswerGenerator::new(Arc::new(model)).generate("q", "c").await.unwrap_err();
        assert!(matches!(err, Error::Generation(ref m) if m.contains("quota exceeded")));
    }
}
