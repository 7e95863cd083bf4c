//! Orchestrator: dispatches a task plan to specialists
//!
//! One orchestrator, two strategies selected by [`ExecutionMode`]:
//! - Parallel: every step fans out at once with the same inputs
//! - Sequential: steps run by descending priority, each seeing earlier results
//!
//! Both go through [`dispatch`], which turns a timeout, panic or abort into
//! that kind's failure envelope, and both finish in [`combiner::assemble`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::OrchestrationError;
use crate::models::{
    AnalysisContext, CompositeAnalysis, ExecutionMode, PlanStep, ResultMap, SpecialistKind,
    SpecialistResult, TaskPlan,
};
use crate::registry::AgentRegistry;
use crate::specialists::{contract_for, Specialist, SpecialistRequest};

pub mod combiner;

#[derive(Debug, Clone, Copy)]
pub struct ExecutionSettings {
    /// Bound on each specialist call and on synthesis
    pub specialist_timeout: Duration,
    pub enable_synthesis: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            specialist_timeout: Duration::from_secs(60),
            enable_synthesis: true,
        }
    }
}

impl From<&crate::config::Settings> for ExecutionSettings {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            specialist_timeout: settings.specialist_timeout,
            enable_synthesis: settings.enable_synthesis,
        }
    }
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    settings: ExecutionSettings,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, settings: ExecutionSettings) -> Self {
        Self { registry, settings }
    }

    /// Run every planned step and assemble the composite answer.
    ///
    /// Never fails: the result holds exactly one entry per planned kind.
    pub async fn execute(
        &self,
        plan: &TaskPlan,
        query: &str,
        context: Arc<AnalysisContext>,
        mode: ExecutionMode,
    ) -> CompositeAnalysis {
        let started = Instant::now();
        info!(mode = %mode, steps = plan.steps.len(), "Executing task plan");

        let mut results = match mode {
            ExecutionMode::Parallel => self.fan_out(plan, query, &context).await,
            ExecutionMode::Sequential => self.chain(plan, query, &context).await,
        };

        for kind in plan.kinds() {
            results.entry(kind).or_insert_with(|| {
                warn!(kind = %kind, "No result collected for planned specialist");
                contract_for(kind).failure("Specialist did not return a result")
            });
        }

        let synthesis = if mode == ExecutionMode::Sequential && self.settings.enable_synthesis {
            combiner::synthesize(
                self.registry.base(),
                query,
                &plan.main_objective,
                &results,
                self.settings.specialist_timeout,
            )
            .await
        } else {
            None
        };

        let failed = results.values().filter(|r| !r.success).count();
        info!(
            mode = %mode,
            succeeded = results.len() - failed,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Task plan executed"
        );

        combiner::assemble(plan, mode, results, synthesis)
    }

    async fn fan_out(&self, plan: &TaskPlan, query: &str, context: &Arc<AnalysisContext>) -> ResultMap {
        let mut join_set = JoinSet::new();

        for step in &plan.steps {
            let specialist = self.registry.get(step.kind);
            let request = request_for(step, query, context, ResultMap::new());
            let timeout = self.settings.specialist_timeout;
            let kind = step.kind;

            join_set.spawn(async move { (kind, dispatch(specialist, request, timeout).await) });
        }

        let mut results = ResultMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((kind, result)) => {
                    results.insert(kind, result);
                }
                // dispatch contains its own panics; the missing kind is filled in by execute
                Err(e) => warn!(error = %e, "Fan-out task failed"),
            }
        }
        results
    }

    async fn chain(&self, plan: &TaskPlan, query: &str, context: &Arc<AnalysisContext>) -> ResultMap {
        let mut results = ResultMap::new();

        for (position, step) in plan.steps_by_priority().into_iter().enumerate() {
            debug!(
                kind = %step.kind,
                position,
                priority = step.priority,
                carried = results.len(),
                "Chain step starting"
            );

            let request = request_for(step, query, context, results.clone());
            let result = dispatch(
                self.registry.get(step.kind),
                request,
                self.settings.specialist_timeout,
            )
            .await;

            results.insert(step.kind, result);
        }

        results
    }
}

fn request_for(
    step: &PlanStep,
    query: &str,
    context: &Arc<AnalysisContext>,
    previous_results: ResultMap,
) -> SpecialistRequest {
    SpecialistRequest {
        query: query.to_string(),
        context: context.clone(),
        sub_questions: step.sub_questions.clone(),
        rationale: Some(step.rationale.clone()).filter(|r| !r.trim().is_empty()),
        previous_results,
    }
}

/// Spawned task that is aborted when its handle is dropped.
///
/// Dropping the awaiting future (a disconnected caller, an outer timeout)
/// takes the task down with it.
pub(crate) struct AbortOnDrop<T>(JoinHandle<T>);

impl<T: Send + 'static> AbortOnDrop<T> {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one specialist on its own task, bounded by `timeout`
pub async fn dispatch(
    specialist: Arc<dyn Specialist>,
    request: SpecialistRequest,
    timeout: Duration,
) -> SpecialistResult {
    let kind: SpecialistKind = specialist.kind();
    let task = AbortOnDrop::spawn(async move { specialist.analyze(&request).await });

    let result = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) if e.is_panic() => {
            warn!(kind = %kind, "Specialist panicked");
            contract_for(kind).failure("Specialist failed unexpectedly")
        }
        Ok(Err(e)) => {
            warn!(kind = %kind, error = %e, "Specialist task cancelled");
            contract_for(kind).failure("Specialist task was cancelled")
        }
        Err(_) => {
            warn!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "Specialist timed out");
            contract_for(kind).failure(format!("Specialist {}", OrchestrationError::Timeout(timeout)))
        }
    };

    if !result.success && result.message.as_deref().map_or(true, |m| m.trim().is_empty()) {
        return contract_for(kind).failure("Specialist reported failure without details");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::llm::{MockGenerator, MockReply};
    use crate::supplementary::NoSupplementaryData;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn step(kind: SpecialistKind, priority: u8) -> PlanStep {
        PlanStep {
            kind,
            priority,
            rationale: format!("{} is relevant", kind),
            sub_questions: vec![format!("What does {} say?", kind)],
        }
    }

    fn plan(steps: Vec<PlanStep>) -> TaskPlan {
        TaskPlan::new("Improve the business", steps, None)
    }

    fn registry(mock: Arc<MockGenerator>) -> AgentRegistry {
        AgentRegistry::new(mock, Arc::new(NoSupplementaryData), &Settings::default())
    }

    fn orchestrator(registry: AgentRegistry, timeout: Duration) -> Orchestrator {
        Orchestrator::new(
            Arc::new(registry),
            ExecutionSettings {
                specialist_timeout: timeout,
                enable_synthesis: true,
            },
        )
    }

    /// Records which earlier results it was shown
    struct Recording {
        kind: SpecialistKind,
        seen: Arc<Mutex<Vec<(SpecialistKind, Vec<SpecialistKind>)>>>,
    }

    #[async_trait]
    impl Specialist for Recording {
        fn kind(&self) -> SpecialistKind {
            self.kind
        }

        async fn analyze(&self, request: &SpecialistRequest) -> SpecialistResult {
            let previous = request.previous_results.keys().copied().collect();
            self.seen.lock().unwrap().push((self.kind, previous));
            let mut result = contract_for(self.kind).failure("unused");
            result.success = true;
            result.message = None;
            result
        }
    }

    struct Panicking(SpecialistKind);

    #[async_trait]
    impl Specialist for Panicking {
        fn kind(&self) -> SpecialistKind {
            self.0
        }

        async fn analyze(&self, _request: &SpecialistRequest) -> SpecialistResult {
            panic!("boom")
        }
    }

    /// Sleeps, then marks itself finished
    struct Slow {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Specialist for Slow {
        fn kind(&self) -> SpecialistKind {
            SpecialistKind::Location
        }

        async fn analyze(&self, _request: &SpecialistRequest) -> SpecialistResult {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.finished.store(true, Ordering::SeqCst);
            contract_for(SpecialistKind::Location).failure("done")
        }
    }

    #[tokio::test]
    async fn test_dropped_dispatch_aborts_specialist_task() {
        let finished = Arc::new(AtomicBool::new(false));
        let specialist = Arc::new(Slow { finished: finished.clone() });
        let request = SpecialistRequest::new("Where should we open?", Arc::default());

        let outer = tokio::time::timeout(
            Duration::from_millis(20),
            dispatch(specialist, request, Duration::from_secs(5)),
        )
        .await;
        assert!(outer.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropped_parallel_execution_aborts_specialists() {
        let finished = Arc::new(AtomicBool::new(false));
        let mut registry = registry(Arc::new(MockGenerator::new()));
        registry.register(Arc::new(Slow { finished: finished.clone() }));
        let orchestrator = orchestrator(registry, Duration::from_secs(5));
        let plan = plan(vec![step(SpecialistKind::Location, 5)]);

        let outer = tokio::time::timeout(
            Duration::from_millis(20),
            orchestrator.execute(&plan, "Where should we open?", Arc::default(), ExecutionMode::Parallel),
        )
        .await;
        assert!(outer.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_parallel_containment() {
        let orchestrator = orchestrator(registry(Arc::new(MockGenerator::new())), Duration::from_secs(5));
        let plan = plan(vec![
            step(SpecialistKind::Market, 5),
            step(SpecialistKind::Menu, 5),
            step(SpecialistKind::Trend, 5),
        ]);

        let out = orchestrator
            .execute(&plan, "Grow weekday sales", Arc::default(), ExecutionMode::Parallel)
            .await;

        let keys: BTreeSet<SpecialistKind> = out.results.keys().copied().collect();
        let planned: BTreeSet<SpecialistKind> = plan.kinds().into_iter().collect();
        assert_eq!(keys, planned);
        assert!(out.results.values().all(|r| r.success));
        assert!(out.synthesis.is_none());
        assert_eq!(out.main_objective, "Improve the business");
    }

    #[tokio::test]
    async fn test_parallel_isolation() {
        let mock = Arc::new(
            MockGenerator::new().respond_when("restaurant market analyst", MockReply::Fail("injected".into())),
        );
        let orchestrator = orchestrator(registry(mock), Duration::from_secs(5));
        let plan = plan(vec![step(SpecialistKind::Market, 5), step(SpecialistKind::Customer, 5)]);

        let out = orchestrator
            .execute(&plan, "Who should we target?", Arc::default(), ExecutionMode::Parallel)
            .await;

        let market = &out.results[&SpecialistKind::Market];
        assert!(!market.success);
        assert!(market.message.as_deref().unwrap().contains("injected"));
        assert!(out.results[&SpecialistKind::Customer].success);
        assert!(out.success);
    }

    #[tokio::test]
    async fn test_chain_carries_only_earlier_results() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry(Arc::new(MockGenerator::new()));
        for kind in [SpecialistKind::Competitor, SpecialistKind::Market, SpecialistKind::Financial] {
            registry.register(Arc::new(Recording { kind, seen: seen.clone() }));
        }
        let orchestrator = orchestrator(registry, Duration::from_secs(5));
        let plan = plan(vec![
            step(SpecialistKind::Financial, 3),
            step(SpecialistKind::Competitor, 9),
            step(SpecialistKind::Market, 6),
        ]);

        orchestrator
            .execute(&plan, "Price against competitors", Arc::default(), ExecutionMode::Sequential)
            .await;

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (SpecialistKind::Competitor, vec![]),
                (SpecialistKind::Market, vec![SpecialistKind::Competitor]),
                (
                    SpecialistKind::Financial,
                    vec![SpecialistKind::Market, SpecialistKind::Competitor]
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_chain_continues_past_failure_and_synthesizes() {
        let mock = Arc::new(
            MockGenerator::new()
                .respond_when("competitive intelligence analyst", MockReply::Fail("injected".into())),
        );
        let orchestrator = orchestrator(registry(mock.clone()), Duration::from_secs(5));
        let plan = plan(vec![step(SpecialistKind::Competitor, 9), step(SpecialistKind::Financial, 4)]);

        let out = orchestrator
            .execute(&plan, "How should we price?", Arc::default(), ExecutionMode::Sequential)
            .await;

        assert!(!out.results[&SpecialistKind::Competitor].success);
        assert!(out.results[&SpecialistKind::Financial].success);
        assert!(out.synthesis.is_some());

        let financial_prompt = mock
            .calls()
            .into_iter()
            .find(|c| c.contract == Some("financial_analysis"))
            .unwrap()
            .prompt;
        assert!(financial_prompt.contains("[competitor] unavailable"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure_envelope() {
        let mock = Arc::new(MockGenerator::new().respond_when(
            "food-service trend analyst",
            MockReply::Delayed(Duration::from_secs(10), Box::new(MockReply::Text("{}".into()))),
        ));
        let orchestrator = orchestrator(registry(mock), Duration::from_millis(50));
        let plan = plan(vec![step(SpecialistKind::Trend, 5), step(SpecialistKind::Location, 5)]);

        for mode in [ExecutionMode::Parallel, ExecutionMode::Sequential] {
            let out = orchestrator.execute(&plan, "What is next?", Arc::default(), mode).await;
            let trend = &out.results[&SpecialistKind::Trend];
            assert!(!trend.success);
            assert!(trend.message.as_deref().unwrap().contains("timed out"));
            assert!(trend.fields.contains_key("trendSummary"));
            assert!(out.results[&SpecialistKind::Location].success);
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut registry = registry(Arc::new(MockGenerator::new()));
        registry.register(Arc::new(Panicking(SpecialistKind::Menu)));
        let orchestrator = orchestrator(registry, Duration::from_secs(5));
        let plan = plan(vec![step(SpecialistKind::Menu, 5), step(SpecialistKind::Financial, 5)]);

        for mode in [ExecutionMode::Parallel, ExecutionMode::Sequential] {
            let out = orchestrator.execute(&plan, "Fix the menu", Arc::default(), mode).await;
            assert_eq!(out.results.len(), 2);
            assert!(!out.results[&SpecialistKind::Menu].success);
            assert!(out.results[&SpecialistKind::Financial].success);
        }
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let mock = Arc::new(MockGenerator::new());
        let orchestrator = orchestrator(registry(mock.clone()), Duration::from_secs(5));
        let plan = plan(vec![]);

        let out = orchestrator
            .execute(&plan, "What is the capital of France?", Arc::default(), ExecutionMode::Sequential)
            .await;

        assert!(out.success);
        assert!(out.results.is_empty());
        assert!(out.synthesis.is_none());
        assert!(mock.calls().is_empty());
    }
}
