//! Generic base agent: prompt + contract → validated object

use std::sync::Arc;

use crate::contract::{extract_json, OutputContract};
use crate::llm::{Generated, GenerationRequest, Generator};
use crate::models::SpecialistResult;
use crate::Result;

/// Shared generate-and-validate discipline used by specialists and the
/// coordinator.
#[derive(Clone)]
pub struct BaseAgent {
    generator: Arc<dyn Generator>,
}

impl BaseAgent {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Generate an object and validate it against `contract`.
    ///
    /// Generators without structured-output support get the contract's JSON
    /// skeleton appended to the prompt and their raw text parsed.
    pub async fn generate_object(
        &self,
        prompt: &str,
        system_instruction: &str,
        contract: &OutputContract,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let prompt = if self.generator.supports_contracts() {
            prompt.to_string()
        } else {
            let skeleton = serde_json::to_string_pretty(&contract.skeleton())?;
            format!(
                "{}\n\nRespond ONLY with valid JSON (no explanation text) in exactly this structure:\n{}",
                prompt, skeleton
            )
        };

        let generated = self
            .generator
            .generate(GenerationRequest::structured(&prompt, system_instruction, contract))
            .await?;

        let value = match generated {
            Generated::Structured(value) => value,
            Generated::Text(text) => extract_json(&text)?,
        };

        contract.validate(&value)
    }

    /// [`BaseAgent::generate_object`] wrapped in a success envelope
    pub async fn generate_validated(
        &self,
        prompt: &str,
        system_instruction: &str,
        contract: &OutputContract,
    ) -> Result<SpecialistResult> {
        let object = self
            .generate_object(prompt, system_instruction, contract)
            .await?;
        contract.success(&serde_json::Value::Object(object))
    }

    /// Free-text generation, no contract
    pub async fn generate_text(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        let generated = self
            .generator
            .generate(GenerationRequest::text(prompt, system_instruction))
            .await?;
        Ok(generated.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Field, Shape};
    use crate::llm::{MockGenerator, MockReply};
    use serde_json::json;

    fn contract() -> OutputContract {
        OutputContract::new(
            "short_answer",
            vec![
                Field::required("answer", Shape::String),
                Field::required("tags", Shape::strings()),
            ],
        )
    }

    #[tokio::test]
    async fn test_structured_reply_validated() {
        let mock = MockGenerator::new().respond_when(
            "sys",
            MockReply::Json(json!({ "answer": "yes", "tags": ["a"] })),
        );
        let agent = BaseAgent::new(Arc::new(mock));

        let out = agent.generate_object("q", "sys", &contract()).await.unwrap();
        assert_eq!(out["answer"], json!("yes"));
    }

    #[tokio::test]
    async fn test_fenced_text_reply_parsed() {
        let mock = MockGenerator::new().respond_when(
            "sys",
            MockReply::Text("```json\n{\"answer\": \"ok\", \"tags\": []}\n```".into()),
        );
        let agent = BaseAgent::new(Arc::new(mock));

        let result = agent.generate_validated("q", "sys", &contract()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.get("answer"), Some(&json!("ok")));
    }

    #[tokio::test]
    async fn test_text_only_generator_prompt_includes_skeleton() {
        let mock = Arc::new(MockGenerator::new().text_only());
        let agent = BaseAgent::new(mock.clone());

        let out = agent.generate_object("q", "sys", &contract()).await.unwrap();
        assert_eq!(out["tags"], json!(["Sample tags"]));
        assert!(mock.calls()[0].prompt.contains("\"tags\""));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_error() {
        let mock = MockGenerator::new().respond_when("sys", MockReply::Text("I cannot help".into()));
        let agent = BaseAgent::new(Arc::new(mock));

        assert!(agent.generate_object("q", "sys", &contract()).await.is_err());
    }

    #[tokio::test]
    async fn test_generate_text() {
        let agent = BaseAgent::new(Arc::new(MockGenerator::new()));
        let text = agent.generate_text("summarize", "sys").await.unwrap();
        assert!(text.contains("Mock synthesis"));
    }
}
