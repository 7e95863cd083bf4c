//! Coordinator: query + context → task plan
//!
//! The coordinator decides once which specialists are relevant and what each
//! should answer. It never revisits the plan after dispatch.

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde_json::{Map, Value};
use tracing::warn;

use crate::contract::{Field, OutputContract, Shape};
use crate::error::OrchestrationError;
use crate::models::{
    AgentKind, AnalysisContext, ExecutionMode, PlanStep, SpecialistDescriptor, SpecialistKind,
    TaskPlan, MAX_PRIORITY, MIN_PRIORITY,
};
use crate::Result;

pub mod keyword;
pub mod llm;

pub use keyword::KeywordCoordinator;
pub use llm::LlmCoordinator;

/// Trait for plan generation
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn plan(&self, query: &str, context: &AnalysisContext) -> Result<TaskPlan>;
}

lazy_static! {
    static ref PLAN_CONTRACT: OutputContract = OutputContract::new(
        "task_plan",
        vec![
            Field::required("mainObjective", Shape::String)
                .describe("One sentence restating what the business owner wants to achieve"),
            Field::required(
                "steps",
                Shape::list(Shape::Object(vec![
                    Field::required("kind", Shape::String).describe(
                        "One of: market, menu, customer, competitor, financial, location, trend"
                    ),
                    Field::required("priority", Shape::Integer)
                        .describe("1 (least important) to 10 (most important)"),
                    Field::required("rationale", Shape::String),
                    Field::required("subQuestions", Shape::strings()),
                ])),
            ),
            Field::optional("executionMode", Shape::String)
                .describe("'sequential' when later specialists need earlier findings, else 'parallel'"),
        ],
    );
}

/// Output contract the coordinator's answer must satisfy
pub fn plan_contract() -> &'static OutputContract {
    &PLAN_CONTRACT
}

pub fn descriptor() -> SpecialistDescriptor {
    SpecialistDescriptor {
        kind: AgentKind::Coordinator,
        display_name: "Coordinator",
        description: "Classifies a business question into a plan of specialist consultations",
        capabilities: vec!["query classification", "task decomposition", "specialist selection"],
    }
}

/// Turn a contract-validated plan object into a [`TaskPlan`].
///
/// Kinds outside the closed set are dropped with a warning; priorities are
/// clamped and duplicates merged by [`TaskPlan::new`].
pub fn parse_plan(object: &Map<String, Value>) -> Result<TaskPlan> {
    let main_objective = object
        .get("mainObjective")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OrchestrationError::InvalidPlan("mainObjective is empty".to_string()))?;

    let raw_steps = object
        .get("steps")
        .and_then(Value::as_array)
        .ok_or_else(|| OrchestrationError::InvalidPlan("steps is not a list".to_string()))?;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for raw in raw_steps {
        let name = raw.get("kind").and_then(Value::as_str).unwrap_or_default();
        let kind = match name.parse::<SpecialistKind>() {
            Ok(kind) => kind,
            Err(_) => {
                warn!(kind = %name, "Coordinator proposed an unknown specialist, ignoring step");
                continue;
            }
        };

        let priority = raw
            .get("priority")
            .and_then(Value::as_i64)
            .unwrap_or(MIN_PRIORITY as i64)
            .clamp(MIN_PRIORITY as i64, MAX_PRIORITY as i64) as u8;

        let sub_questions = raw
            .get("subQuestions")
            .and_then(Value::as_array)
            .map(|qs| {
                qs.iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        steps.push(PlanStep {
            kind,
            priority,
            rationale: raw
                .get("rationale")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            sub_questions,
        });
    }

    let execution_mode = match object.get("executionMode").and_then(Value::as_str) {
        Some(raw) if !raw.trim().is_empty() => match raw.parse::<ExecutionMode>() {
            Ok(mode) => Some(mode),
            Err(_) => {
                warn!(mode = %raw, "Coordinator proposed an unknown execution mode, ignoring");
                None
            }
        },
        _ => None,
    };

    Ok(TaskPlan::new(main_objective, steps, execution_mode))
}
