//! Question + schema in, SQL out.

use crate::llm::client::SqlGenerator;
use crate::llm::extract::extract_sql;
use crate::llm::prompt;
use crate::types::{ExecutableQuery, Result, SynthesisRequest};

/// Output of one synthesis attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    /// Reply text exactly as the model returned it
    pub raw: String,

    /// Statement extracted from `raw`
    pub query: ExecutableQuery,
}

/// Renders the fixed prompt and asks the model for SQL.
///
/// One model call per [`synthesize`](Self::synthesize); no validation of
/// the reply beyond extraction.
pub struct QuerySynthesizer<G> {
    generator: G,
}

impl<G: SqlGenerator> QuerySynthesizer<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Underlying generator.
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Ask the model and return its raw reply.
    ///
    /// # Errors
    ///
    /// Returns `AskError::LlmError` if the model call fails
    pub async fn synthesize_raw(&self, request: &SynthesisRequest) -> Result<String> {
        let rendered = prompt::render(request);
        tracing::debug!(model = self.generator.model(), prompt = %rendered, "Synthesizing SQL");
        let raw = self.generator.complete(&rendered).await?;
        tracing::debug!(raw = %raw, "Raw model output");
        Ok(raw)
    }

    /// Ask the model and extract the statement from its reply.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis> {
        let raw = self.synthesize_raw(request).await?;
        let query = extract_sql(&raw);
        Ok(Synthesis { raw, query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AskError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SqlGenerator for Recording {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    struct Failing;

    #[async_trait]
    impl SqlGenerator for Failing {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(AskError::LlmError("rate limited".to_string()))
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest {
            question: "how many orders".to_string(),
            table_info: "CREATE TABLE orders (id INT)".to_string(),
            candidate_tables: "orders".to_string(),
        }
    }

    #[tokio::test]
    async fn test_synthesize_sends_rendered_prompt() {
        let synthesizer = QuerySynthesizer::new(Recording {
            reply: "```sql\nSELECT COUNT(*) FROM orders\n```".to_string(),
            prompts: Mutex::new(vec![]),
        });

        let synthesis = synthesizer.synthesize(&request()).await.unwrap();
        assert_eq!(synthesis.query.as_str(), "SELECT COUNT(*) FROM orders;");
        assert!(synthesis.raw.starts_with("```sql"));

        let prompts = synthesizer.generator().prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], prompt::render(&request()));
    }

    #[tokio::test]
    async fn test_generator_failure_propagates() {
        let synthesizer = QuerySynthesizer::new(Failing);
        let err = synthesizer.synthesize(&request()).await.unwrap_err();
        assert!(matches!(err, AskError::LlmError(_)));
    }
}
