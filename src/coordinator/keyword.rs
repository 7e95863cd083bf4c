//! Deterministic keyword coordinator
//!
//! Routes by intent keywords without a model call. Used for offline runs and
//! as a predictable planner in tests.

use async_trait::async_trait;
use tracing::info;

use crate::coordinator::Coordinator;
use crate::error::OrchestrationError;
use crate::models::{AnalysisContext, PlanStep, SpecialistKind, TaskPlan};
use crate::Result;

struct Route {
    kind: SpecialistKind,
    /// Upstream domains run first when chained
    priority: u8,
    keywords: &'static [&'static str],
    question: &'static str,
}

const ROUTES: &[Route] = &[
    Route {
        kind: SpecialistKind::Competitor,
        priority: 9,
        keywords: &["competitor", "competition", "compete", "rival", "other restaurants", "nearby restaurants"],
        question: "Who are the relevant competitors and how are they positioned?",
    },
    Route {
        kind: SpecialistKind::Market,
        priority: 8,
        keywords: &["market", "demand", "opportunit", "segment", "audience", "open a", "launch"],
        question: "How large and how fast-growing is the relevant market?",
    },
    Route {
        kind: SpecialistKind::Location,
        priority: 8,
        keywords: &["location", "neighborhood", "neighbourhood", "foot traffic", "delivery zone", "expand", "second site", "where should"],
        question: "How well does the location support the business?",
    },
    Route {
        kind: SpecialistKind::Trend,
        priority: 7,
        keywords: &["trend", "trending", "season", "popular", "fad", "consumer preference"],
        question: "Which trends are most relevant right now?",
    },
    Route {
        kind: SpecialistKind::Customer,
        priority: 7,
        keywords: &["customer", "guest", "review", "loyal", "retention", "regulars", "satisfaction", "diner"],
        question: "What do customers value and what drives them away?",
    },
    Route {
        kind: SpecialistKind::Menu,
        priority: 6,
        keywords: &["menu", "dish", "item", "recipe", "price", "pricing", "upsell"],
        question: "Which menu changes would have the biggest impact?",
    },
    Route {
        kind: SpecialistKind::Financial,
        priority: 5,
        keywords: &["profit", "margin", "cost", "revenue", "sales", "price", "pricing", "budget", "expense", "cash flow", "break even"],
        question: "What do the numbers say and which levers matter most?",
    },
];

/// Keyword-routed coordinator
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordCoordinator;

impl KeywordCoordinator {
    pub fn new() -> Self {
        Self
    }

    fn select(query: &str) -> Vec<PlanStep> {
        let lowered = query.to_lowercase();

        ROUTES
            .iter()
            .filter_map(|route| {
                let hits: Vec<&str> = route
                    .keywords
                    .iter()
                    .copied()
                    .filter(|k| lowered.contains(k))
                    .collect();
                if hits.is_empty() {
                    return None;
                }
                Some(PlanStep {
                    kind: route.kind,
                    priority: route.priority,
                    rationale: format!("Question mentions {}", hits.join(", ")),
                    sub_questions: vec![route.question.to_string()],
                })
            })
            .collect()
    }
}

#[async_trait]
impl Coordinator for KeywordCoordinator {
    async fn plan(&self, query: &str, _context: &AnalysisContext) -> Result<TaskPlan> {
        let query = query.trim();
        if query.is_empty() {
            return Err(OrchestrationError::InvalidInput(
                "Query must not be empty".to_string(),
            ));
        }

        let steps = Self::select(query);
        info!(kinds = ?steps.iter().map(|s| s.kind).collect::<Vec<_>>(), "Keyword plan created");

        Ok(TaskPlan::new(format!("Answer the owner's question: {}", query), steps, None))
    }
}
