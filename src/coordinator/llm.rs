//! Generative coordinator

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::coordinator::{parse_plan, plan_contract, Coordinator};
use crate::error::OrchestrationError;
use crate::llm::Generator;
use crate::models::{AnalysisContext, SpecialistKind, TaskPlan};
use crate::specialists::{self, BaseAgent};
use crate::Result;

const SYSTEM_ROLE: &str = r#"You are the coordinator of a team of restaurant business specialists.

Your only job is to decide which specialists should answer the owner's
question and what each of them should focus on. You do not answer the
question yourself.

The team is closed. Valid specialist kinds are exactly:
market, menu, customer, competitor, financial, location, trend.
Never invent other kinds. If the question has nothing to do with running a
restaurant or food business, return an empty list of steps."#;

pub struct LlmCoordinator {
    base: BaseAgent,
}

impl LlmCoordinator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            base: BaseAgent::new(generator),
        }
    }

    fn build_prompt(&self, query: &str, context: &AnalysisContext) -> String {
        let team: Vec<String> = SpecialistKind::ALL
            .iter()
            .map(|kind| {
                let d = &specialists::profile(*kind).descriptor;
                format!("- {}: {} ({})", kind, d.description, d.capabilities.join(", "))
            })
            .collect();

        format!(
            r#"BUSINESS QUESTION:
{}

BUSINESS CONTEXT:
{}

AVAILABLE SPECIALISTS:
{}

Rules:
- Select only specialists whose expertise is needed; usually 1 to 4
- priority is an integer from 1 to 10, higher runs earlier when chained
- rationale explains in one sentence why the specialist is needed
- subQuestions are 1 to 3 concrete questions for that specialist
- executionMode is "sequential" only when a specialist needs another's findings
- mainObjective restates the owner's goal in one sentence, even when no specialist applies"#,
            query.trim(),
            context.render(),
            team.join("\n"),
        )
    }
}

#[async_trait]
impl Coordinator for LlmCoordinator {
    async fn plan(&self, query: &str, context: &AnalysisContext) -> Result<TaskPlan> {
        if query.trim().is_empty() {
            return Err(OrchestrationError::InvalidInput(
                "Query must not be empty".to_string(),
            ));
        }

        let prompt = self.build_prompt(query, context);
        debug!(prompt_len = prompt.len(), "Coordinator prompt rendered");

        let object = self
            .base
            .generate_object(&prompt, SYSTEM_ROLE, plan_contract())
            .await
            .map_err(|e| OrchestrationError::PlanningError(e.to_string()))?;

        let plan = parse_plan(&object)?;

        info!(
            steps = plan.steps.len(),
            kinds = ?plan.kinds(),
            mode = ?plan.execution_mode,
            "Task plan created"
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockGenerator, MockReply};
    use serde_json::json;

    #[tokio::test]
    async fn test_plan_from_model_answer() {
        let mock = Arc::new(MockGenerator::new().respond_when(
            "coordinator",
            MockReply::Json(json!({
                "mainObjective": "Improve profit margins",
                "steps": [{ "kind": "financial", "priority": 8, "rationale": "Margins", "subQuestions": ["Which costs?"] }]
            })),
        ));
        let coordinator = LlmCoordinator::new(mock.clone());

        let plan = coordinator
            .plan("How can I improve my profit margins?", &AnalysisContext::default())
            .await
            .unwrap();

        assert_eq!(plan.kinds(), vec![SpecialistKind::Financial]);
        let call = &mock.calls()[0];
        assert_eq!(call.contract, Some("task_plan"));
        assert!(call.prompt.contains("- trend:"));
        assert!(call.prompt.contains("How can I improve my profit margins?"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_call() {
        let mock = Arc::new(MockGenerator::new());
        let coordinator = LlmCoordinator::new(mock.clone());

        let err = coordinator.plan("", &AnalysisContext::default()).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidInput(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_is_planning_error() {
        let mock = Arc::new(MockGenerator::new().respond_when("coordinator", MockReply::Fail("quota".into())));
        let err = LlmCoordinator::new(mock)
            .plan("What should we add to the menu?", &AnalysisContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::PlanningError(_)));
    }

    #[tokio::test]
    async fn test_malformed_plan_is_error() {
        let mock = Arc::new(MockGenerator::new().respond_when(
            "coordinator",
            MockReply::Json(json!({ "mainObjective": "x", "steps": "market" })),
        ));
        let result = LlmCoordinator::new(mock)
            .plan("Is there demand for brunch?", &AnalysisContext::default())
            .await;
        tokio_test::assert_err!(result);
    }
}
