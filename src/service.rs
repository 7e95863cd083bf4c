//! Service facade: the single entry point for callers
//!
//! query + context → coordinator plan → orchestrator → composite result.
//! Anything that escapes the inner layers becomes the top-level failure
//! envelope; callers never see an error.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::classifier::ModeClassifier;
use crate::config::{ModePreference, Settings};
use crate::error::OrchestrationError;
use crate::execution::{AbortOnDrop, ExecutionSettings, Orchestrator};
use crate::llm::Generator;
use crate::models::{AnalysisContext, CompositeResult, ExecutionMode, TaskPlan};
use crate::registry::AgentRegistry;
use crate::supplementary::SupplementaryData;

pub struct InsightService {
    registry: Arc<AgentRegistry>,
    orchestrator: Orchestrator,
    mode: ModePreference,
    plan_timeout: Duration,
}

impl InsightService {
    pub fn new(registry: Arc<AgentRegistry>, orchestrator: Orchestrator, settings: &Settings) -> Self {
        Self {
            registry,
            orchestrator,
            mode: settings.mode,
            plan_timeout: settings.specialist_timeout,
        }
    }

    /// Wire a registry and orchestrator around one generator
    pub fn build(
        generator: Arc<dyn Generator>,
        data: Arc<dyn SupplementaryData>,
        settings: &Settings,
    ) -> Self {
        let registry = Arc::new(AgentRegistry::new(generator, data, settings));
        Self::with_registry(registry, settings)
    }

    pub fn with_registry(registry: Arc<AgentRegistry>, settings: &Settings) -> Self {
        let orchestrator = Orchestrator::new(registry.clone(), ExecutionSettings::from(settings));
        Self::new(registry, orchestrator, settings)
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub async fn handle(&self, query: &str, context: AnalysisContext) -> CompositeResult {
        self.handle_with_mode(query, context, None).await
    }

    /// [`InsightService::handle`] with an explicit mode that overrides plan and config
    pub async fn handle_with_mode(
        &self,
        query: &str,
        context: AnalysisContext,
        mode: Option<ExecutionMode>,
    ) -> CompositeResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("analyze", request_id = %request_id);

        self.run(query, context, mode).instrument(span).await
    }

    async fn run(
        &self,
        query: &str,
        context: AnalysisContext,
        requested: Option<ExecutionMode>,
    ) -> CompositeResult {
        let query = query.trim();
        if query.is_empty() {
            warn!("Rejected empty query");
            return CompositeResult::failure("Query must not be empty");
        }

        info!(query = %query, "Analysis request received");
        let context = Arc::new(context);

        let plan = match self.plan(query, context.clone()).await {
            Ok(plan) => plan,
            Err(message) => {
                warn!(error = %message, "Planning failed");
                return CompositeResult::failure(message);
            }
        };

        let mode = self.resolve_mode(requested, query, &plan);

        let analysis = self.orchestrator.execute(&plan, query, context, mode).await;
        CompositeResult::Completed(analysis)
    }

    /// Coordinator call on its own task so a panic or hang stays contained
    async fn plan(&self, query: &str, context: Arc<AnalysisContext>) -> Result<TaskPlan, String> {
        let coordinator = self.registry.coordinator();
        let owned_query = query.to_string();
        let task = AbortOnDrop::spawn(async move { coordinator.plan(&owned_query, &context).await });

        match tokio::time::timeout(self.plan_timeout, task).await {
            Ok(Ok(Ok(plan))) => Ok(plan),
            Ok(Ok(Err(e))) => Err(format!("Failed to plan the analysis: {}", e)),
            Ok(Err(e)) => Err(format!("Failed to plan the analysis: coordinator task failed ({})", e)),
            Err(_) => Err(format!(
                "Failed to plan the analysis: coordinator {}",
                OrchestrationError::Timeout(self.plan_timeout)
            )),
        }
    }

    /// Caller, then plan, then configuration
    fn resolve_mode(&self, requested: Option<ExecutionMode>, query: &str, plan: &TaskPlan) -> ExecutionMode {
        requested
            .or(plan.execution_mode)
            .unwrap_or_else(|| match self.mode {
                ModePreference::Fixed(mode) => mode,
                ModePreference::Auto => ModeClassifier::suggest(query, plan),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Coordinator, KeywordCoordinator};
    use crate::llm::{MockGenerator, MockReply};
    use crate::models::SpecialistKind;
    use crate::supplementary::NoSupplementaryData;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn settings(mode: ModePreference) -> Settings {
        Settings {
            mode,
            specialist_timeout: Duration::from_secs(5),
            ..Settings::default()
        }
    }

    fn service(mock: Arc<MockGenerator>, mode: ModePreference) -> InsightService {
        InsightService::build(mock, Arc::new(NoSupplementaryData), &settings(mode))
    }

    fn keyword_service(mock: Arc<MockGenerator>, mode: ModePreference) -> InsightService {
        let settings = settings(mode);
        let mut registry = AgentRegistry::new(mock, Arc::new(NoSupplementaryData), &settings);
        registry.set_coordinator(Arc::new(KeywordCoordinator));
        InsightService::with_registry(Arc::new(registry), &settings)
    }

    fn plan_reply(steps: serde_json::Value) -> MockReply {
        MockReply::Json(json!({ "mainObjective": "Answer the owner", "steps": steps }))
    }

    #[tokio::test]
    async fn test_margin_question_yields_financial_result() {
        let mock = Arc::new(MockGenerator::new().respond_when(
            "coordinator of a team",
            plan_reply(json!([
                { "kind": "financial", "priority": 9, "rationale": "Margins", "subQuestions": ["Which costs are high?"] }
            ])),
        ));
        let out = service(mock, ModePreference::Fixed(ExecutionMode::Parallel))
            .handle("How can I improve my profit margins?", AnalysisContext::default())
            .await;

        let analysis = out.analysis().unwrap();
        let financial = &analysis.results[&SpecialistKind::Financial];
        assert!(financial.success);
        assert!(!financial.get("financialRecommendations").unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_margin_question_with_model_down_keeps_key() {
        let mock = Arc::new(
            MockGenerator::new()
                .respond_when(
                    "coordinator of a team",
                    plan_reply(json!([{ "kind": "financial", "priority": 9, "rationale": "", "subQuestions": [] }])),
                )
                .respond_when("profitability advisor", MockReply::Fail("model unavailable".into())),
        );
        let out = service(mock, ModePreference::Fixed(ExecutionMode::Parallel))
            .handle("How can I improve my profit margins?", AnalysisContext::default())
            .await;

        assert!(out.is_success());
        let financial = &out.analysis().unwrap().results[&SpecialistKind::Financial];
        assert!(!financial.success);
        assert!(!financial.message.as_deref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_competitor_pricing_chains_into_financial() {
        let mock = Arc::new(MockGenerator::new().respond_when(
            "competitive intelligence analyst",
            MockReply::Json(json!({
                "competitiveLandscape": "Three pizzerias within a mile",
                "competitors": [{ "name": "Pie Co", "strengths": ["speed"], "weaknesses": ["quality"], "pricePosition": "budget" }],
                "competitiveAdvantages": ["wood-fired oven"],
                "pricingStrategy": "Price 10% above Pie Co",
                "recommendations": ["Lead with quality"]
            })),
        ));
        let out = keyword_service(mock.clone(), ModePreference::Auto)
            .handle(
                "Who are our main competitors and how should we price against them?",
                AnalysisContext::default(),
            )
            .await;

        let analysis = out.analysis().unwrap();
        assert_eq!(analysis.execution_mode, ExecutionMode::Sequential);
        assert!(analysis.results.contains_key(&SpecialistKind::Competitor));
        assert!(analysis.results.contains_key(&SpecialistKind::Financial));
        assert!(analysis.synthesis.is_some());

        let financial_prompt = mock
            .calls()
            .into_iter()
            .find(|c| c.contract == Some("financial_analysis"))
            .unwrap()
            .prompt;
        assert!(financial_prompt.contains("Price 10% above Pie Co"));
    }

    #[tokio::test]
    async fn test_empty_query_invokes_nothing() {
        let mock = Arc::new(MockGenerator::new());
        let out = service(mock.clone(), ModePreference::Auto)
            .handle("   ", AnalysisContext::default())
            .await;

        assert!(!out.is_success());
        match out {
            CompositeResult::Failed(envelope) => assert!(!envelope.message.is_empty()),
            CompositeResult::Completed(_) => panic!("expected failure envelope"),
        }
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_domain_query_is_empty_success() {
        let mock = Arc::new(MockGenerator::new());
        let out = keyword_service(mock.clone(), ModePreference::Fixed(ExecutionMode::Sequential))
            .handle("What is the capital of France?", AnalysisContext::default())
            .await;

        let analysis = out.analysis().unwrap();
        assert!(analysis.success);
        assert!(analysis.results.is_empty());
        assert!(!analysis.main_objective.is_empty());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_coordinator_failure_is_top_level_envelope() {
        let mock = Arc::new(MockGenerator::new().respond_when(
            "coordinator of a team",
            MockReply::Text("I am not sure what you mean".into()),
        ));
        let out = service(mock, ModePreference::Auto)
            .handle("Should we add a lunch special?", AnalysisContext::default())
            .await;

        assert!(!out.is_success());
        assert!(out.analysis().is_none());
    }

    struct Stuck;

    #[async_trait]
    impl Coordinator for Stuck {
        async fn plan(&self, _query: &str, _context: &AnalysisContext) -> crate::Result<TaskPlan> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(TaskPlan::new("never", vec![], None))
        }
    }

    #[tokio::test]
    async fn test_coordinator_timeout_is_top_level_envelope() {
        let settings = Settings {
            specialist_timeout: Duration::from_millis(30),
            ..Settings::default()
        };
        let mut registry = AgentRegistry::new(Arc::new(MockGenerator::new()), Arc::new(NoSupplementaryData), &settings);
        registry.set_coordinator(Arc::new(Stuck));
        let service = InsightService::with_registry(Arc::new(registry), &settings);

        match service.handle("Grow sales", AnalysisContext::default()).await {
            CompositeResult::Failed(envelope) => assert!(envelope.message.contains("timed out")),
            CompositeResult::Completed(_) => panic!("expected failure envelope"),
        }
    }

    struct SlowPlanner {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Coordinator for SlowPlanner {
        async fn plan(&self, _query: &str, _context: &AnalysisContext) -> crate::Result<TaskPlan> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(TaskPlan::new("late", vec![], None))
        }
    }

    #[tokio::test]
    async fn test_dropped_request_aborts_planning() {
        let finished = Arc::new(AtomicBool::new(false));
        let settings = settings(ModePreference::Auto);
        let mut registry = AgentRegistry::new(Arc::new(MockGenerator::new()), Arc::new(NoSupplementaryData), &settings);
        registry.set_coordinator(Arc::new(SlowPlanner { finished: finished.clone() }));
        let service = InsightService::with_registry(Arc::new(registry), &settings);

        let outer = tokio::time::timeout(
            Duration::from_millis(20),
            service.handle("Grow sales", AnalysisContext::default()),
        )
        .await;
        assert!(outer.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_mode_resolution_order() {
        let mock = Arc::new(MockGenerator::new().respond_when(
            "coordinator of a team",
            MockReply::Json(json!({
                "mainObjective": "Review the menu",
                "steps": [
                    { "kind": "menu", "priority": 7, "rationale": "", "subQuestions": [] },
                    { "kind": "trend", "priority": 5, "rationale": "", "subQuestions": [] }
                ],
                "executionMode": "sequential"
            })),
        ));
        let service = service(mock, ModePreference::Fixed(ExecutionMode::Parallel));

        let from_plan = service.handle("Review our menu", AnalysisContext::default()).await;
        assert_eq!(from_plan.analysis().unwrap().execution_mode, ExecutionMode::Sequential);

        let from_caller = service
            .handle_with_mode("Review our menu", AnalysisContext::default(), Some(ExecutionMode::Parallel))
            .await;
        assert_eq!(from_caller.analysis().unwrap().execution_mode, ExecutionMode::Parallel);
        assert!(from_caller.analysis().unwrap().synthesis.is_none());
    }
}
